use crate::identity::{NodeId, BITS};
use crate::node::finger_entry::FingerEntry;
use crate::node::node_ref::NodeRef;

/// Ordered array of `M` entries; entry `i` targets `self + 2^i (mod 2^M)`
/// and caches its current successor `NodeRef`. Owned by a
/// Chord Node and mutated by `fixFingers`.
#[derive(Clone, Debug)]
pub struct FingerTable {
    pub fingers: Vec<FingerEntry>,
}

impl FingerTable {
    /// Builds a fresh table for a node at `self_id`, every entry initially
    /// pointing back at `self_node` until `fixFingers` resolves it.
    pub fn new(self_id: &NodeId, self_node: &NodeRef) -> FingerTable {
        let fingers = (0..BITS)
            .map(|i| FingerEntry::new(self_id.add_pow2(i), self_node.clone()))
            .collect();
        FingerTable { fingers }
    }

    pub fn len(&self) -> usize {
        self.fingers.len()
    }

    pub fn set_finger(&mut self, index: usize, node: NodeRef) {
        self.fingers[index].node = node;
    }

    pub fn set_all_fingers(&mut self, node: &NodeRef) {
        for finger in &mut self.fingers {
            finger.node = node.clone();
        }
    }

    /// `closestPrecedingFinger(id)`: scans the table back to front for the
    /// finger strictly between `self` and `id`, else `self`.
    pub fn closest_preceding_finger(&self, self_id: &NodeId, id: &NodeId, self_node: &NodeRef) -> NodeRef {
        for finger in self.fingers.iter().rev() {
            if crate::identity::is_between(&finger.node.id, self_id, id, false, false) {
                return finger.node.clone();
            }
        }
        self_node.clone()
    }
}
