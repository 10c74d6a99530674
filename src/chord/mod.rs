//! The Chord Node component: ring state, the gRPC surface peers call,
//! and the periodic maintenance tasks that keep the ring converged.

pub mod client;
pub mod join;
pub mod lookup;
pub mod maintenance;
pub mod node;
pub mod ring;
pub mod service;

pub use node::ChordNode;
pub use service::ChordGrpcService;
