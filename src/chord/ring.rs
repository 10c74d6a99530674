//! Ring-wide membership snapshots, used by the DHT's scatter-gather
//! `keys()` and by the job coordinator's round-robin worker selection.
//! Not part of the Chord RPC surface itself, a convenience built on top
//! of repeated `getSuccessorList` calls.

use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord_proto::Empty;
use crate::config::Config;
use crate::node::NodeRef;

/// Walks direct-successor pointers starting at `node` until the ring
/// closes back on itself, or `cap` is hit as a backstop against a ring
/// that never quiesces. Unreachable nodes terminate the walk early
/// rather than failing it, returning a partial-but-live snapshot.
pub async fn snapshot_live_ring(node: &ChordNode, config: &Config, cap: usize) -> Vec<NodeRef> {
    let mut ring = vec![node.self_ref.clone()];
    let mut current = node.direct_successor();

    while current.id != node.self_ref.id && ring.len() < cap {
        ring.push(current.clone());
        let mut client = match connect_with_retry(&current.address, config).await {
            Ok(client) => client,
            Err(_) => break,
        };
        let successor_list = match client.get_successor_list(Request::new(Empty {})).await {
            Ok(resp) => resp.into_inner(),
            Err(_) => break,
        };
        match successor_list.successors.first() {
            Some(next) => current = next.into(),
            None => break,
        }
    }

    ring
}

/// Pings a node and reports whether it answered within the request
/// timeout. Workers are polled with this before task assignment.
pub async fn is_alive(node: &NodeRef, config: &Config) -> bool {
    match connect_with_retry(&node.address, config).await {
        Ok(mut client) => client.ping(Request::new(Empty {})).await.is_ok(),
        Err(_) => false,
    }
}
