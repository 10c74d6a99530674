pub mod chord_proto {
    tonic::include_proto!("chord");

    pub(crate) const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("chord_descriptor");
}

pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod node;
pub mod chord;
pub mod dht;
pub mod job;
pub mod runtime;
