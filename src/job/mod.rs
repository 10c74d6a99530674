//! The Job Coordinator: splits input into chunks, dispatches map/reduce
//! tasks over the DHT's addressing, tracks per-task state, detects
//! failures via RPC timeouts, and reissues work.

pub mod coordinator;
pub mod kernel;
pub mod types;
pub mod worker;

pub use coordinator::JobCoordinator;
pub use types::{JobId, Phase, TaskDescriptor, TaskState};
