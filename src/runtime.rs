//! Process-wide wiring: one Chord Node, one DHT shard and the gRPC server
//! exposing both (plus the job coordinator surface) on a single port, the
//! way one node process hosts one of each.

use std::sync::Arc;

use tonic::transport::Server;

use crate::chord::node::ChordNode;
use crate::chord::service::ChordGrpcService;
use crate::chord::{join, maintenance};
use crate::chord_proto::chord_server::ChordServer;
use crate::chord_proto::FILE_DESCRIPTOR_SET;
use crate::config::Config;
use crate::dht::store::Store;
use crate::job::kernel::KernelRegistry;
use crate::node::NodeRef;

pub struct RuntimeHandles {
    pub node: Arc<ChordNode>,
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub registry: Arc<KernelRegistry>,
    maintenance_tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Drop for RuntimeHandles {
    fn drop(&mut self) {
        for task in &self.maintenance_tasks {
            task.abort();
        }
    }
}

/// Joins the ring (or starts a singleton one), wires up the DHT store and
/// kernel registry, and spawns the periodic maintenance tasks. Does not
/// start the gRPC server itself, see `serve`.
pub async fn bootstrap(
    address: String,
    peer: Option<String>,
    config: Config,
) -> Result<RuntimeHandles, crate::error::CoreError> {
    config
        .validate()
        .map_err(crate::error::CoreError::Internal)?;

    let self_ref = NodeRef::new(address);
    let node = Arc::new(join::join(peer, self_ref, &config).await?);
    let store = Arc::new(Store::new());
    let config = Arc::new(config);
    let registry = Arc::new(KernelRegistry::with_builtins());

    let maintenance_tasks = maintenance::spawn_periodic_tasks(node.clone(), store.clone(), config.clone());

    Ok(RuntimeHandles {
        node,
        store,
        config,
        registry,
        maintenance_tasks,
    })
}

/// Builds the tonic service (with reflection) and serves it until the
/// process is killed.
pub async fn serve(handles: RuntimeHandles) -> Result<(), tonic::transport::Error> {
    let address = handles.node.self_ref.address.clone();
    let socket_addr = address
        .parse()
        .unwrap_or_else(|_| panic!("invalid listen address: {}", address));

    let service = ChordGrpcService::new(
        handles.node.clone(),
        handles.store.clone(),
        handles.config.clone(),
        handles.registry.clone(),
    );

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build()
        .expect("failed to build reflection service");

    log::info!("serving {} (dev_mode={})", address, handles.config.dev_mode);

    Server::builder()
        .add_service(ChordServer::new(service))
        .add_service(reflection)
        .serve(socket_addr)
        .await
}
