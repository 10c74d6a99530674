//! Join protocol: a new node asks a bootstrap peer for its direct
//! successor, seeds its successor list from that successor's own list,
//! and leaves full ring integration (finger repair, predecessor
//! discovery) to the periodic `stabilize`/`fixFingers` tasks (see
//! DESIGN.md).

use tonic::Request;

use crate::chord::client::connect_with_retry;
use crate::chord::node::ChordNode;
use crate::chord_proto::{Empty, HashPosMsg};
use crate::config::Config;
use crate::error::CoreResult;
use crate::node::{Address, NodeRef};

pub async fn join(
    bootstrap: Option<Address>,
    self_ref: NodeRef,
    config: &Config,
) -> CoreResult<ChordNode> {
    let node = match bootstrap {
        None => ChordNode::singleton(self_ref, config.successor_list_len),
        Some(peer_address) => {
            let mut peer_client = connect_with_retry(&peer_address, config).await?;

            let successor_msg: crate::chord_proto::NodeRefMsg = peer_client
                .find_successor(Request::new(HashPosMsg::from(self_ref.id)))
                .await?
                .into_inner();
            let successor: NodeRef = successor_msg.into();

            let node = ChordNode::singleton(self_ref, config.successor_list_len);
            node.set_direct_successor(successor.clone());

            if successor.id != node.id() {
                if let Ok(mut successor_client) = connect_with_retry(&successor.address, config).await {
                    if let Ok(resp) = successor_client
                        .get_successor_list(Request::new(Empty {}))
                        .await
                    {
                        let peers: Vec<NodeRef> =
                            resp.into_inner().successors.iter().map(NodeRef::from).collect();
                        node.successor_list
                            .lock()
                            .unwrap()
                            .refill_from(successor, peers);
                    }
                }
            }

            node
        }
    };

    Ok(node)
}
