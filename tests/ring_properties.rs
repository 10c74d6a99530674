//! Quantified ring invariants exercised without a network: ring ownership,
//! successor-list refill, and the replication fan-out window, all
//! reachable on bare `ChordNode`/`Store` values.

use mr_chord::chord::lookup::owns;
use mr_chord::chord::node::ChordNode;
use mr_chord::config::Config;
use mr_chord::dht::replication::replica_targets;
use mr_chord::identity::NodeId;
use mr_chord::node::NodeRef;

#[test]
fn a_singleton_node_owns_every_key() {
    let node = ChordNode::singleton(NodeRef::new("n0:1".into()), 5);
    assert!(owns(&node, &NodeId::of(b"anything")));
    assert!(owns(&node, &NodeId::of(b"something-else")));
}

#[test]
fn a_node_with_a_predecessor_only_owns_its_half_open_interval() {
    let self_ref = NodeRef::new("self:1".into());
    let node = ChordNode::singleton(self_ref.clone(), 5);
    let predecessor = NodeRef::new("predecessor:1".into());
    node.set_predecessor(Some(predecessor.clone()));

    // self is always inside (predecessor, self].
    assert!(owns(&node, &self_ref.id));
    // the predecessor's own id is excluded (half-open on the low end).
    assert!(!owns(&node, &predecessor.id));
}

#[test]
fn replica_targets_excludes_self_and_is_capped_at_r_minus_one() {
    let self_ref = NodeRef::new("self:1".into());
    let node = ChordNode::singleton(self_ref.clone(), 5);

    let peers: Vec<NodeRef> = (0..4).map(|i| NodeRef::new(format!("peer-{}:1", i))).collect();
    node.successor_list
        .lock()
        .unwrap()
        .refill_from(peers[0].clone(), peers[1..].to_vec());

    let mut config = Config::default();
    config.dht_replication_size = 3;
    let targets = replica_targets(&node, &config);

    assert!(targets.len() <= 2, "replica_targets must be capped at R-1");
    assert!(targets.iter().all(|t| t.id != node.id()));
}

#[test]
fn successor_list_refill_deduplicates_and_respects_capacity() {
    let self_ref = NodeRef::new("self:1".into());
    let mut list = mr_chord::node::SuccessorList::singleton(self_ref.clone(), 3);

    let a = NodeRef::new("a:1".into());
    let b = NodeRef::new("b:1".into());
    list.refill_from(a.clone(), vec![a.clone(), b.clone(), b.clone()]);

    assert_eq!(list.successors.len(), 2);
    assert_eq!(list.successors[0].address, a.address);
    assert_eq!(list.successors[1].address, b.address);
}
