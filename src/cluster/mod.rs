//! Cluster Assembly Module
//!
//! Identity and topology of the fixed peer set, plus [`node::DsmNode`],
//! the wired-together node object applications hold.

pub mod config;
pub mod node;
pub mod types;
