use crate::node::node_ref::NodeRef;

/// Ordered list of up to `S` live successor `NodeRef`s, `S >= R`. Owned
/// by a Chord Node and refreshed by `stabilize`.
#[derive(Clone, Debug)]
pub struct SuccessorList {
    pub successors: Vec<NodeRef>,
    capacity: usize,
}

impl SuccessorList {
    /// A brand-new node is its own sole successor until stabilization
    /// discovers others (the singleton ring case).
    pub fn singleton(self_node: NodeRef, capacity: usize) -> SuccessorList {
        SuccessorList {
            successors: vec![self_node],
            capacity,
        }
    }

    pub fn direct_successor(&self) -> &NodeRef {
        &self.successors[0]
    }

    pub fn set_direct_successor(&mut self, node: NodeRef) {
        if self.successors.is_empty() {
            self.successors.push(node);
        } else {
            self.successors[0] = node;
        }
    }

    /// Drops the dead head and promotes the next entry. Returns `true`
    /// if a live successor remains.
    pub fn promote_next(&mut self) -> bool {
        if !self.successors.is_empty() {
            self.successors.remove(0);
        }
        !self.successors.is_empty()
    }

    /// Rebuilds the list as `[direct_successor] ++ direct_successor's own
    /// list`, truncated to capacity.
    pub fn refill_from(&mut self, successor: NodeRef, successors_list: Vec<NodeRef>) {
        let mut rebuilt = Vec::with_capacity(self.capacity);
        rebuilt.push(successor);
        for node in successors_list {
            if rebuilt.len() >= self.capacity {
                break;
            }
            if !rebuilt.iter().any(|n| n.id == node.id) {
                rebuilt.push(node);
            }
        }
        self.successors = rebuilt;
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRef> {
        self.successors.iter()
    }
}
