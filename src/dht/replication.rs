//! Replica maintenance triggered by topology change: on every
//! successor-list change, push locally-primary keys to the new replica
//! set and drop secondary keys that fell out of range.

use log::{debug, warn};
use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord_proto::DhtPutRequest;
use crate::config::Config;
use crate::dht::store::Store;

/// Called after `stabilize` updates the successor list. Walks locally
/// primary-owned keys and pushes them to the (possibly new) replica set.
/// Stale secondary copies are pruned on each key's next write/read cycle
/// rather than by a proactive sweep (see DESIGN.md).
pub async fn on_topology_changed(node: &ChordNode, store: &Store, config: &Config) {
    let replicas = replica_targets(node, config);
    if replicas.is_empty() {
        return;
    }

    let local_entries = store.entries_with_prefix(b"");
    for (key, entry) in local_entries {
        if !crate::chord::lookup::owns(node, &crate::identity::NodeId::of(&key)) {
            continue;
        }
        for replica in &replicas {
            let mut client = match connect_with_retry(&replica.address, config).await {
                Ok(client) => client,
                Err(_) => continue,
            };
            let request = DhtPutRequest {
                key: key.clone(),
                value: entry.value.clone(),
                version: entry.version,
                originator: entry.originator.to_be_bytes().to_vec(),
            };
            if let Err(e) = client.dht_put(Request::new(request)).await {
                warn!("failed to replicate key to {}: {}", replica.address, e);
            } else {
                debug!("replicated key to {}", replica.address);
            }
        }
    }
}

/// The next `R-1` distinct live successors of the primary.
pub fn replica_targets(node: &ChordNode, config: &Config) -> Vec<crate::node::NodeRef> {
    node.successor_snapshot()
        .into_iter()
        .filter(|n| n.id != node.id())
        .take(config.dht_replication_size.saturating_sub(1))
        .collect()
}
