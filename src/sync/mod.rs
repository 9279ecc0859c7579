//! Synchronization Module
//!
//! Local building block of the distributed lock: a per-object
//! multiple-reader/single-writer lock manager with writer preference.
//! The coherence engine composes these across an object's home and backup
//! to serialize access cluster-wide.

pub mod lock_manager;
