use std::sync::Mutex;

use crate::identity::NodeId;
use crate::node::{FingerTable, NodeRef, SuccessorList};

/// In-memory state owned by one Chord Node process: successor list,
/// predecessor, finger table, each behind its own short-held lock so peer
/// RPCs performed while reading a snapshot never block other state
/// transitions (snapshot-then-release).
pub struct ChordNode {
    pub self_ref: NodeRef,
    pub finger_table: Mutex<FingerTable>,
    pub successor_list: Mutex<SuccessorList>,
    pub predecessor: Mutex<Option<NodeRef>>,
    pub fix_finger_index: Mutex<usize>,
}

impl ChordNode {
    pub fn singleton(self_ref: NodeRef, successor_list_len: usize) -> ChordNode {
        let finger_table = FingerTable::new(&self_ref.id, &self_ref);
        let successor_list = SuccessorList::singleton(self_ref.clone(), successor_list_len);
        ChordNode {
            self_ref,
            finger_table: Mutex::new(finger_table),
            successor_list: Mutex::new(successor_list),
            predecessor: Mutex::new(None),
            fix_finger_index: Mutex::new(0),
        }
    }

    pub fn id(&self) -> NodeId {
        self.self_ref.id
    }

    pub fn direct_successor(&self) -> NodeRef {
        self.successor_list.lock().unwrap().direct_successor().clone()
    }

    pub fn set_direct_successor(&self, node: NodeRef) {
        self.successor_list.lock().unwrap().set_direct_successor(node.clone());
        self.finger_table.lock().unwrap().set_finger(0, node);
    }

    pub fn predecessor(&self) -> Option<NodeRef> {
        self.predecessor.lock().unwrap().clone()
    }

    pub fn set_predecessor(&self, node: Option<NodeRef>) {
        *self.predecessor.lock().unwrap() = node;
    }

    /// `closestPrecedingFinger(id)`, with the edge case of a self-query
    /// returning `self`.
    pub fn closest_preceding_finger(&self, id: &NodeId) -> NodeRef {
        self.finger_table
            .lock()
            .unwrap()
            .closest_preceding_finger(&self.self_ref.id, id, &self.self_ref)
    }

    pub fn successor_snapshot(&self) -> Vec<NodeRef> {
        self.successor_list.lock().unwrap().successors.clone()
    }
}
