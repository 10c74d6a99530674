//! The `findSuccessor` algorithm itself, shared between the gRPC handler
//! that answers peer calls and the node's own maintenance tasks
//! (`fixFingers`, join) that need the same lookup internally.
//!
//! **Forwarding mode:** iterative from the originating caller's point of
//! view. A relaying node performs one hop server-side: it asks its
//! closest preceding finger and, if that hop is reachable, recurses into
//! *that* node's `find_successor` RPC and returns its answer, but falls
//! back to delegating through its own predecessor if the chosen hop is
//! unreachable, rather than leaving the originator to retry blindly.

use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord_proto::HashPosMsg;
use crate::config::Config;
use crate::error::CoreResult;
use crate::identity::{is_between, NodeId};
use crate::node::NodeRef;

pub async fn find_successor(node: &ChordNode, config: &Config, target: NodeId) -> CoreResult<NodeRef> {
    let successor = node.direct_successor();

    // singleton ring: findSuccessor always answers self.
    if node.id() == successor.id {
        return Ok(node.self_ref.clone());
    }

    if is_between(&target, &node.id(), &successor.id, false, true) {
        return Ok(successor);
    }

    let closest = node.closest_preceding_finger(&target);
    if closest.id == node.id() {
        // no finger strictly precedes the target; our successor is the
        // best answer we can give (the self-query edge case).
        return Ok(successor);
    }

    match connect_with_retry(&closest.address, config).await {
        Ok(mut client) => match client.find_successor(Request::new(HashPosMsg::from(target))).await {
            Ok(resp) => Ok(resp.into_inner().into()),
            Err(status) => delegate_to_predecessor(node, config, target, status.into()).await,
        },
        Err(e) => delegate_to_predecessor(node, config, target, e).await,
    }
}

async fn delegate_to_predecessor(
    node: &ChordNode,
    config: &Config,
    target: NodeId,
    original_err: crate::error::CoreError,
) -> CoreResult<NodeRef> {
    if let Some(predecessor) = node.predecessor() {
        if let Ok(mut predecessor_client) = connect_with_retry(&predecessor.address, config).await {
            if let Ok(resp) = predecessor_client
                .find_successor(Request::new(HashPosMsg::from(target)))
                .await
            {
                return Ok(resp.into_inner().into());
            }
        }
    }
    Err(original_err)
}

/// A peer is always responsible for the half-open interval `(predecessor,
/// self]`. Used to decide local vs. forwarded DHT access.
pub fn owns(node: &ChordNode, key: &NodeId) -> bool {
    match node.predecessor() {
        Some(predecessor) => is_between(key, &predecessor.id, &node.id(), false, true),
        // no predecessor yet (still joining): only true once `self` is its
        // own successor (singleton ring).
        None => node.id() == node.direct_successor().id,
    }
}
