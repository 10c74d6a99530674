use std::fmt;

use crate::identity::NodeId;
use crate::node::node_ref::NodeRef;

/// One entry of a [`FingerTable`](crate::node::FingerTable): the target
/// identifier `self + 2^i (mod 2^M)` and the current best-known node that
/// answers for it.
#[derive(Clone)]
pub struct FingerEntry {
    pub target: NodeId,
    pub node: NodeRef,
}

impl FingerEntry {
    pub fn new(target: NodeId, node: NodeRef) -> FingerEntry {
        FingerEntry { target, node }
    }
}

impl fmt::Debug for FingerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerEntry")
            .field("target", &self.target)
            .field("node", &self.node)
            .finish()
    }
}
