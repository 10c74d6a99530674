//! Executed by whichever node is the assignee of a `RunMap`/`RunReduce`
//! RPC: fetch inputs from the DHT, run the named kernel, write results
//! back under well-known job keys.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chord::node::ChordNode;
use crate::config::Config;
use crate::dht::router;
use crate::dht::store::Store;
use crate::error::{CoreError, CoreResult};
use crate::identity::NodeId;
use crate::job::kernel::KernelRegistry;
use crate::job::types::JobId;

/// One (in_key, in_value) pair as stored in a chunk: input chunks are
/// written into the DHT keyed by chunk id.
#[derive(Serialize, Deserialize, Clone)]
pub struct ChunkItem {
    pub in_key: String,
    pub in_value: String,
}

/// A single emitted intermediate pair, stored verbatim so the reduce side
/// can recover the exact `out_key` even though the DHT key bucket is only
/// `id(out_key)` and may collide across distinct keys.
#[derive(Serialize, Deserialize, Clone)]
pub struct InterPair {
    pub out_key: String,
    pub value: String,
}

pub async fn run_map(
    node: Arc<ChordNode>,
    store: Arc<Store>,
    config: Arc<Config>,
    registry: &KernelRegistry,
    job_id: JobId,
    task_index: u32,
    chunk_key: String,
    kernel_key: String,
) -> CoreResult<()> {
    let chunk_bytes = router::get(&node, &store, &config, chunk_key.into_bytes()).await?;
    let chunk: Vec<ChunkItem> = serde_json::from_slice(&chunk_bytes)
        .map_err(|e| CoreError::Internal(format!("malformed chunk payload: {}", e)))?;
    let (kernel_id, args) = fetch_kernel(&node, &store, &config, kernel_key).await?;

    let mut seq: u64 = 0;

    for item in &chunk {
        let emitted = registry.invoke_map(&kernel_id, &item.in_key, &item.in_value, &args)?;
        for (out_key, mid_value) in emitted {
            let bucket = NodeId::of(out_key.as_bytes()).to_string();
            let inter_key = job_id.inter_key(&bucket, task_index, seq);
            seq += 1;

            let payload = InterPair {
                out_key,
                value: mid_value,
            };
            let bytes = serde_json::to_vec(&payload)
                .map_err(|e| CoreError::Internal(format!("failed to encode intermediate pair: {}", e)))?;

            enforce_job_capacity(&node, &store, &config, &job_id, bytes.len() as u64).await?;
            router::put(node.clone(), store.clone(), config.clone(), inter_key.into_bytes(), bytes).await?;
        }
    }

    Ok(())
}

pub async fn run_reduce(
    node: Arc<ChordNode>,
    store: Arc<Store>,
    config: Arc<Config>,
    registry: &KernelRegistry,
    job_id: JobId,
    _task_index: u32,
    out_key: String,
    kernel_key: String,
) -> CoreResult<()> {
    let (kernel_id, args) = fetch_kernel(&node, &store, &config, kernel_key).await?;
    let bucket = NodeId::of(out_key.as_bytes()).to_string();
    let prefix = format!("{}{}/", job_id.inter_key_prefix(), bucket);
    let keys = router::keys_scatter_gather(&node, &store, &config, prefix.as_bytes()).await;

    let mut values = Vec::new();
    for key in keys {
        let bytes = match router::get(&node, &store, &config, key).await {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let pair: InterPair = match serde_json::from_slice(&bytes) {
            Ok(pair) => pair,
            Err(_) => continue,
        };
        if pair.out_key == out_key {
            values.push(pair.value);
        }
    }

    let output = registry.invoke_reduce(&kernel_id, &out_key, &values, &args)?;

    let final_key = job_id.out_key(&out_key);
    router::put(node, store, config, final_key.into_bytes(), output.into_bytes()).await?;
    Ok(())
}

/// Fetches the `"<kernel_id>\n<kernel_args_json>"` blob a job's coordinator
/// wrote at submit time and splits it back into the two parts.
async fn fetch_kernel(
    node: &ChordNode,
    store: &Store,
    config: &Config,
    kernel_key: String,
) -> CoreResult<(String, serde_json::Value)> {
    let bytes = router::get(node, store, config, kernel_key.into_bytes()).await?;
    let blob = String::from_utf8(bytes)
        .map_err(|e| CoreError::Internal(format!("malformed kernel handle: {}", e)))?;
    let (kernel_id, kernel_args_json) = blob
        .split_once('\n')
        .ok_or_else(|| CoreError::Internal("malformed kernel handle: missing separator".to_string()))?;
    let args: serde_json::Value = serde_json::from_str(kernel_args_json).unwrap_or(serde_json::Value::Null);
    Ok((kernel_id.to_string(), args))
}

async fn enforce_job_capacity(
    node: &ChordNode,
    store: &Store,
    config: &Config,
    job_id: &JobId,
    incoming_bytes: u64,
) -> CoreResult<()> {
    if !crate::chord::lookup::owns(node, &NodeId::of(job_id.inter_key_prefix().as_bytes())) {
        // capacity accounting is best-effort, scoped to whichever node
        // happens to host the measured prefix locally.
        return Ok(());
    }
    let used = store.bytes_used_with_prefix(job_id.dht_prefix().as_bytes());
    if used + incoming_bytes > config.max_job_bytes {
        return Err(CoreError::CapacityExceeded {
            job_id: job_id.0.clone(),
            used: used + incoming_bytes,
            limit: config.max_job_bytes,
        });
    }
    Ok(())
}
