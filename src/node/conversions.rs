//! `From`/`Into` glue between the wire messages generated from
//! `proto/chord.proto` and this crate's internal node types.

use crate::chord_proto::{FingerEntryDebugMsg, HashPosMsg, NodeRefMsg};
use crate::identity::NodeId;
use crate::node::finger_entry::FingerEntry;
use crate::node::node_ref::NodeRef;

impl From<&NodeId> for HashPosMsg {
    fn from(id: &NodeId) -> HashPosMsg {
        HashPosMsg {
            key: id.to_be_bytes().to_vec(),
        }
    }
}

impl From<NodeId> for HashPosMsg {
    fn from(id: NodeId) -> HashPosMsg {
        (&id).into()
    }
}

impl From<&HashPosMsg> for NodeId {
    fn from(msg: &HashPosMsg) -> NodeId {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&msg.key[..20]);
        NodeId::from_be_bytes(bytes)
    }
}

impl From<HashPosMsg> for NodeId {
    fn from(msg: HashPosMsg) -> NodeId {
        (&msg).into()
    }
}

impl From<&NodeRef> for NodeRefMsg {
    fn from(node: &NodeRef) -> NodeRefMsg {
        NodeRefMsg {
            id: node.id.to_be_bytes().to_vec(),
            address: node.address.clone(),
        }
    }
}

impl From<NodeRef> for NodeRefMsg {
    fn from(node: NodeRef) -> NodeRefMsg {
        (&node).into()
    }
}

impl From<&NodeRefMsg> for NodeRef {
    fn from(msg: &NodeRefMsg) -> NodeRef {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&msg.id[..20]);
        NodeRef::from_parts(NodeId::from_be_bytes(bytes), msg.address.clone())
    }
}

impl From<NodeRefMsg> for NodeRef {
    fn from(msg: NodeRefMsg) -> NodeRef {
        (&msg).into()
    }
}

impl From<&FingerEntry> for FingerEntryDebugMsg {
    fn from(entry: &FingerEntry) -> FingerEntryDebugMsg {
        FingerEntryDebugMsg {
            id: entry.target.to_string(),
            address: entry.node.address.clone(),
        }
    }
}
