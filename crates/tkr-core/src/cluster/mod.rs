//! In-process [`ClusterClient`](crate::ports::ClusterClient) backed by ordered maps.
//!
//! Used by the tests and by the demo daemon. Every call is appended to an action log
//! and can be made to fail with an injected [`ClientError`](crate::error::ClientError).
mod fixtures;
pub use fixtures::Fixtures;

mod memory;
pub use memory::{Action, DEFAULT_ACTION_LOG_CAPACITY, InMemoryCluster, Op};
