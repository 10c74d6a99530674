//! DHT operation routing: resolve the primary via `findSuccessor`,
//! forward if not local, replicate asynchronously on write, and fall
//! back across replicas on read.

use std::sync::Arc;

use log::warn;
use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord::ring;
use crate::chord_proto::{DhtDeleteRequest, DhtGetRequest, DhtGetStatus, DhtLocalKeysRequest, DhtPutRequest};
use crate::config::Config;
use crate::dht::replication::replica_targets;
use crate::dht::store::Store;
use crate::error::{CoreError, CoreResult};
use crate::identity::NodeId;

/// `put(key, value)`: store locally if this node is the primary,
/// otherwise forward once to the primary. Returns after the local (or
/// forwarded) write; replication to secondaries is fired in the
/// background and only logged on failure.
pub async fn put(
    node: Arc<ChordNode>,
    store: Arc<Store>,
    config: Arc<Config>,
    key: Vec<u8>,
    value: Vec<u8>,
) -> CoreResult<()> {
    let key_id = NodeId::of(&key);

    if crate::chord::lookup::owns(&node, &key_id) {
        let entry = store.put_local(key.clone(), value, node.id());
        let replicas = replica_targets(&node, &config);
        if !replicas.is_empty() {
            tokio::spawn(async move {
                for replica in replicas {
                    let mut client = match connect_with_retry(&replica.address, &config).await {
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
                        warn!("async replication to {} failed: {}", replica.address, e);
                    }
                }
            });
        }
        return Ok(());
    }

    let primary = crate::chord::lookup::find_successor(&node, &config, key_id).await?;
    let mut client = connect_with_retry(&primary.address, &config).await?;
    client
        .dht_put(Request::new(DhtPutRequest {
            key,
            value,
            version: 0,
            originator: node.id().to_be_bytes().to_vec(),
        }))
        .await
        .map_err(CoreError::from)?;
    Ok(())
}

/// `get(key) -> value | NotFound`: resolve the primary; on primary RPC
/// failure, fall back across a live-ring sample of up to `R` nodes (see
/// DESIGN.md). `NotFound` only once every contacted node answered
/// authoritatively without the key; `Unavailable` if none responded.
pub async fn get(node: &ChordNode, store: &Store, config: &Config, key: Vec<u8>) -> CoreResult<Vec<u8>> {
    let key_id = NodeId::of(&key);

    if crate::chord::lookup::owns(node, &key_id) {
        return match store.get(&key) {
            Some(entry) => Ok(entry.value),
            None => Err(CoreError::KeyNotFound),
        };
    }

    let primary = crate::chord::lookup::find_successor(node, config, key_id).await?;
    match connect_with_retry(&primary.address, config).await {
        Ok(mut client) => match client
            .dht_get(Request::new(DhtGetRequest { key: key.clone() }))
            .await
        {
            Ok(resp) => {
                let resp = resp.into_inner();
                return match DhtGetStatus::from_i32(resp.status) {
                    Some(DhtGetStatus::DhtGetOk) => Ok(resp.value),
                    _ => Err(CoreError::KeyNotFound),
                };
            }
            Err(_) => fallback_get(node, config, key).await,
        },
        Err(_) => fallback_get(node, config, key).await,
    }
}

async fn fallback_get(node: &ChordNode, config: &Config, key: Vec<u8>) -> CoreResult<Vec<u8>> {
    let candidates = ring::snapshot_live_ring(node, config, config.dht_replication_size).await;
    let mut any_answered = false;
    for candidate in candidates.iter().filter(|c| c.id != node.id()) {
        let mut client = match connect_with_retry(&candidate.address, config).await {
            Ok(client) => client,
            Err(_) => continue,
        };
        match client
            .dht_get(Request::new(DhtGetRequest { key: key.clone() }))
            .await
        {
            Ok(resp) => {
                any_answered = true;
                let resp = resp.into_inner();
                if DhtGetStatus::from_i32(resp.status) == Some(DhtGetStatus::DhtGetOk) {
                    return Ok(resp.value);
                }
            }
            Err(_) => continue,
        }
    }
    if any_answered {
        Err(CoreError::KeyNotFound)
    } else {
        Err(CoreError::Unavailable)
    }
}

/// `delete(key)`: same routing as `put`, propagated to replicas.
pub async fn delete(node: Arc<ChordNode>, store: Arc<Store>, config: Arc<Config>, key: Vec<u8>) -> CoreResult<()> {
    let key_id = NodeId::of(&key);

    if crate::chord::lookup::owns(&node, &key_id) {
        store.delete(&key);
        let replicas = replica_targets(&node, &config);
        tokio::spawn(async move {
            for replica in replicas {
                if let Ok(mut client) = connect_with_retry(&replica.address, &config).await {
                    let _ = client
                        .dht_delete(Request::new(DhtDeleteRequest { key: key.clone() }))
                        .await;
                }
            }
        });
        return Ok(());
    }

    let primary = crate::chord::lookup::find_successor(&node, &config, key_id).await?;
    let mut client = connect_with_retry(&primary.address, &config).await?;
    client
        .dht_delete(Request::new(DhtDeleteRequest { key }))
        .await
        .map_err(CoreError::from)?;
    Ok(())
}

/// `keys(prefix_predicate)`: scatter-gather across a live-ring sample,
/// deduplicated by key. Callers must tolerate duplicates from
/// overlapping replicas.
pub async fn keys_scatter_gather(node: &ChordNode, store: &Store, config: &Config, prefix: &[u8]) -> Vec<Vec<u8>> {
    let ring = ring::snapshot_live_ring(node, config, usize::MAX).await;
    let mut seen: std::collections::BTreeSet<Vec<u8>> = store.keys_with_prefix(prefix).into_iter().collect();

    for peer in ring.iter().filter(|p| p.id != node.id()) {
        let mut client = match connect_with_retry(&peer.address, config).await {
            Ok(client) => client,
            Err(_) => continue,
        };
        let request = DhtLocalKeysRequest {
            prefix: String::from_utf8_lossy(prefix).to_string(),
        };
        if let Ok(resp) = client.dht_local_keys(Request::new(request)).await {
            seen.extend(resp.into_inner().keys);
        }
    }

    seen.into_iter().collect()
}
