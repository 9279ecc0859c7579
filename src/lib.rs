//! Distributed Shared Memory Cluster Library
//!
//! This library crate defines the core modules of a home-based distributed
//! shared memory system: a fixed set of peer nodes cooperates to present a
//! single keyed object space, with one home and one backup node per object
//! and cache replicas everywhere an object has been read.
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`dsm`**: The coherence core. Object placement (home + backup), the
//!   local object store, the typed codec, the coherence engine, and the
//!   scoped access handles that lock on construction and commit on drop.
//! - **`sync`**: The per-object reader/writer lock manager. Each node runs
//!   one; the engine combines the home's and the backup's into a
//!   cluster-wide lock.
//! - **`net`**: The transport seam. An abstract peer messenger consumed by
//!   the engine, the JSON-over-HTTP wire protocol with its axum/reqwest
//!   adapter, and an in-process loopback transport for tests.
//! - **`cluster`**: Node identity, static topology configuration, and the
//!   assembled [`cluster::node::DsmNode`] applications hold.

pub mod cluster;
pub mod dsm;
pub mod net;
pub mod sync;
