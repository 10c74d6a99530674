//! Connects to every address given on the command line, pulls each node's
//! `GetNodeSummary` (dev_mode only), and checks the ring invariants: each
//! node's predecessor is the previous node in id order, finger entries
//! point at the node actually responsible for their target, and each
//! node's successor list matches the next nodes in id order. Exits
//! non-zero and prints every violation found rather than stopping at the
//! first one.

use std::env;

use tonic::Request;

use mr_chord::chord_proto::chord_client::ChordClient;
use mr_chord::chord_proto::{Empty, NodeSummaryMsg};
use mr_chord::identity::NodeId;

#[tokio::main]
async fn main() {
    let addresses: Vec<String> = env::args().skip(1).collect();
    if addresses.is_empty() {
        eprintln!("usage: validate_ring <address> [address...]");
        std::process::exit(2);
    }

    let mut summaries: Vec<NodeSummaryMsg> = Vec::new();
    for address in &addresses {
        match ChordClient::connect(format!("http://{}", address)).await {
            Ok(mut client) => match client.get_node_summary(Request::new(Empty {})).await {
                Ok(resp) => summaries.push(resp.into_inner()),
                Err(e) => {
                    eprintln!("{}: GetNodeSummary failed (is --dev-mode on?): {}", address, e);
                    std::process::exit(2);
                }
            },
            Err(e) => {
                eprintln!("{}: unreachable: {}", address, e);
                std::process::exit(2);
            }
        }
    }

    summaries.sort_by_key(|s| parse_pos(&s.pos));

    let mut violations = Vec::new();
    let n = summaries.len();

    for i in 0..n {
        let predecessor = summaries[i].predecessor.as_ref().map(|p| p.address.clone());
        let expected_predecessor = summaries[(i + n - 1) % n].url.clone();
        if predecessor.as_deref() != Some(expected_predecessor.as_str()) {
            violations.push(format!(
                "node {} has predecessor {:?}, expected {}",
                summaries[i].url, predecessor, expected_predecessor
            ));
        }

        if let Some(list) = &summaries[i].successor_list {
            for (j, successor) in list.successors.iter().enumerate() {
                let expected = summaries[(i + j + 1) % n].url.clone();
                if successor.address != expected {
                    violations.push(format!(
                        "node {} successor_list[{}] is {}, expected {}",
                        summaries[i].url, j, successor.address, expected
                    ));
                }
            }
        }

        for (j, finger) in summaries[i].finger_entries.iter().enumerate() {
            let target: NodeId = finger.id.parse().unwrap_or(NodeId::ZERO);
            let responsible = responsible_for(target, &summaries);
            if finger.address != responsible {
                violations.push(format!(
                    "node {} finger[{}] (target {}) points to {}, expected {}",
                    summaries[i].url, j, finger.id, finger.address, responsible
                ));
            }
        }
    }

    if violations.is_empty() {
        println!("ring of {} nodes is consistent", n);
    } else {
        for v in &violations {
            eprintln!("VIOLATION: {}", v);
        }
        eprintln!("{} violation(s) found", violations.len());
        std::process::exit(1);
    }
}

fn parse_pos(hex: &str) -> NodeId {
    hex.parse().unwrap_or(NodeId::ZERO)
}

/// The node whose position is the first at or after `target` walking the
/// sorted ring, wrapping to the lowest id (the successor of `target`).
fn responsible_for(target: NodeId, summaries: &[NodeSummaryMsg]) -> String {
    summaries
        .iter()
        .find(|s| parse_pos(&s.pos) >= target)
        .or_else(|| summaries.first())
        .map(|s| s.url.clone())
        .unwrap_or_default()
}
