//! Networking Module
//!
//! Everything that carries DSM traffic between nodes.
//!
//! ## Layers
//! - **`messenger`**: the abstract peer interface the engine is written
//!   against.
//! - **`protocol`**: endpoint constants and serde DTOs of the HTTP wire
//!   format.
//! - **`http`** / **`handlers`**: outbound and inbound halves of the HTTP
//!   transport adapter.
//! - **`loopback`**: in-process transport used by tests.

pub mod handlers;
pub mod http;
pub mod loopback;
pub mod messenger;
pub mod protocol;
