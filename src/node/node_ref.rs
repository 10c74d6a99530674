use std::fmt;

use crate::identity::NodeId;

/// Transport address of a peer. Opaque to this crate beyond being a dial
/// target for the gRPC client.
pub type Address = String;

/// `(NodeId, transport address)`, created on discovery and discarded once
/// a node is proven dead.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub id: NodeId,
    pub address: Address,
}

impl NodeRef {
    pub fn new(address: Address) -> NodeRef {
        NodeRef {
            id: NodeId::of(address.as_bytes()),
            address,
        }
    }

    pub fn from_parts(id: NodeId, address: Address) -> NodeRef {
        NodeRef { id, address }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}
