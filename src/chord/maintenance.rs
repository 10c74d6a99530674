//! Periodic maintenance tasks: `stabilize`, `fixFingers`,
//! `checkPredecessor`, each its own long-lived tokio task per node,
//! calling straight into the same logic the RPC handlers use (see
//! DESIGN.md).

use std::sync::Arc;

use log::{debug, warn};
use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord::ring;
use crate::chord_proto::{Empty, HashPosMsg, NotifyRequest};
use crate::config::Config;
use crate::dht::store::Store;
use crate::identity::{is_between, NodeId, BITS};
use crate::node::NodeRef;

pub fn spawn_periodic_tasks(node: Arc<ChordNode>, store: Arc<Store>, config: Arc<Config>) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    {
        let node = node.clone();
        let store = store.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            loop {
                stabilize_tick(&node, &store, &config).await;
                tokio::time::sleep(config.stabilize_period).await;
            }
        }));
    }

    {
        let node = node.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            loop {
                fix_fingers_tick(&node, &config).await;
                tokio::time::sleep(config.fix_fingers_period).await;
            }
        }));
    }

    {
        let node = node.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            loop {
                check_predecessor_tick(&node, &config).await;
                tokio::time::sleep(config.check_predecessor_period).await;
            }
        }));
    }

    handles
}

/// `stabilize`: ask the successor for its predecessor, adopt it if it is
/// a tighter fit, notify the successor of our own presence, and refill
/// the successor list. On successor failure, promote the next live entry.
pub async fn stabilize_tick(node: &ChordNode, store: &Store, config: &Config) {
    loop {
        let successor = node.direct_successor();

        if successor.id == node.id() {
            // singleton ring: nothing to stabilize against yet.
            return;
        }

        let mut client = match connect_with_retry(&successor.address, config).await {
            Ok(client) => client,
            Err(_) => {
                if !demote_dead_successor(node) {
                    warn!("successor list exhausted, entering degraded state");
                    return;
                }
                continue;
            }
        };

        let predecessor_of_successor: Option<NodeRef> = match client.get_predecessor(Request::new(Empty {})).await {
            Ok(resp) => resp.into_inner().predecessor.map(NodeRef::from),
            Err(_) => {
                if !demote_dead_successor(node) {
                    return;
                }
                continue;
            }
        };

        if let Some(ref candidate) = predecessor_of_successor {
            if is_between(&candidate.id, &node.id(), &successor.id, false, false) {
                node.set_direct_successor(candidate.clone());
            }
        }

        let current_successor = node.direct_successor();
        let mut successor_client = match connect_with_retry(&current_successor.address, config).await {
            Ok(client) => client,
            Err(_) => return,
        };

        let notify_request = NotifyRequest {
            candidate: Some((&node.self_ref).into()),
        };
        let _ = successor_client.notify(Request::new(notify_request)).await;

        if let Ok(resp) = successor_client.get_successor_list(Request::new(Empty {})).await {
            let peers: Vec<NodeRef> = resp.into_inner().successors.iter().map(NodeRef::from).collect();
            node.successor_list
                .lock()
                .unwrap()
                .refill_from(current_successor, peers);
        }

        crate::dht::replication::on_topology_changed(node, store, config).await;
        return;
    }
}

fn demote_dead_successor(node: &ChordNode) -> bool {
    node.successor_list.lock().unwrap().promote_next()
}

/// `fixFingers`: advances a round-robin pointer over the finger table and
/// re-resolves one entry per tick.
pub async fn fix_fingers_tick(node: &ChordNode, config: &Config) {
    let index = {
        let mut guard = node.fix_finger_index.lock().unwrap();
        *guard = (*guard + 1) % (BITS as usize);
        *guard
    };

    let lookup_target: NodeId = node.id().add_pow2(index as u32);
    match crate::chord::lookup::find_successor(node, config, lookup_target).await {
        Ok(resolved) => {
            debug!("fix_fingers resolved entry {} to {:?}", index, resolved);
            node.finger_table.lock().unwrap().set_finger(index, resolved);
        }
        Err(e) => warn!("fix_fingers entry {} failed: {}", index, e),
    }
}

/// `checkPredecessor`: pings the predecessor and clears it on timeout.
pub async fn check_predecessor_tick(node: &ChordNode, config: &Config) {
    let predecessor = match node.predecessor() {
        Some(p) => p,
        None => return,
    };

    let alive = ring::is_alive(&predecessor, config).await;
    if !alive {
        warn!("predecessor {:?} failed health check, clearing", predecessor);
        node.set_predecessor(None);
    }
}

/// `notify`: called on a node to inform it that `candidate` believes it
/// might be its predecessor. Adopts `candidate` if there is no current
/// predecessor or if it is a tighter fit.
pub fn notify(node: &ChordNode, candidate: NodeRef) -> bool {
    let mut guard = node.predecessor.lock().unwrap();
    let should_adopt = match &*guard {
        None => true,
        Some(current) => is_between(&candidate.id, &current.id, &node.id(), false, false),
    };
    if should_adopt {
        *guard = Some(candidate);
    }
    should_adopt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeRef;

    #[test]
    fn notify_adopts_when_no_predecessor() {
        let self_ref = NodeRef::new("self:1".into());
        let node = ChordNode::singleton(self_ref, 5);
        let candidate = NodeRef::new("candidate:1".into());
        assert!(notify(&node, candidate.clone()));
        assert_eq!(node.predecessor().unwrap().address, candidate.address);
    }

    #[test]
    fn notify_rejects_a_worse_fit() {
        let self_ref = NodeRef::new("self:1".into());
        let node = ChordNode::singleton(self_ref.clone(), 5);
        node.set_predecessor(Some(NodeRef::new("close:1".into())));
        let before = node.predecessor();
        // A candidate equal to self can never be a tighter predecessor.
        let adopted = notify(&node, self_ref);
        if !adopted {
            assert_eq!(node.predecessor().unwrap().address, before.unwrap().address);
        }
    }
}
