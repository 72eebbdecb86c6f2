use super::hrw::{score, Ring};
use std::collections::HashSet;
use std::sync::Arc;

fn ring_of(ids: &[&str]) -> Ring {
    let ring = Ring::new();
    for (i, id) in ids.iter().enumerate() {
        ring.add_node(id, &format!("localhost:{}", 8081 + i));
    }
    ring
}

#[test]
fn test_add_remove_node() {
    let ring = Ring::new();
    assert_eq!(ring.node_count(), 0);

    ring.add_node("node1", "localhost:8081");
    ring.add_node("node2", "localhost:8082");
    ring.add_node("node3", "localhost:8083");
    assert_eq!(ring.node_count(), 3);

    ring.remove_node("node2");
    assert_eq!(ring.node_count(), 2);
    assert_eq!(ring.nodes().len(), 2);

    // Removing an absent node is a no-op
    ring.remove_node("node2");
    assert_eq!(ring.node_count(), 2);
}

#[test]
fn test_add_node_upserts() {
    let ring = Ring::new();
    ring.add_node("node1", "localhost:8081");
    ring.add_node("node1", "localhost:9091");

    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.nodes()[0].addr, "localhost:9091");
}

#[test]
fn test_owners_distinct() {
    let ring = ring_of(&["node1", "node2", "node3"]);

    let owners = ring.owners("test-key", 3);
    assert_eq!(owners.len(), 3);

    let ids: HashSet<&str> = owners.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_owners_deterministic() {
    let ring = ring_of(&["node1", "node2", "node3"]);

    let owners1 = ring.owners("stable-test-key", 2);
    let owners2 = ring.owners("stable-test-key", 2);

    assert_eq!(owners1, owners2);
}

#[test]
fn test_owners_more_than_members() {
    let ring = ring_of(&["node1", "node2"]);

    let owners = ring.owners("test-key", 5);
    assert_eq!(owners.len(), 2);
}

#[test]
fn test_owners_empty_ring() {
    let ring = Ring::new();
    assert!(ring.owners("test-key", 3).is_empty());
}

#[test]
fn test_owners_zero_requested() {
    let ring = ring_of(&["node1"]);
    assert!(ring.owners("test-key", 0).is_empty());
}

#[test]
fn test_score_consistency() {
    assert_eq!(score("test-key", "node1"), score("test-key", "node1"));
    assert_ne!(score("test-key", "node1"), score("test-key", "node2"));
}

#[test]
fn test_owner_distribution() {
    let ring = ring_of(&["node1", "node2", "node3"]);

    let mut primaries: HashSet<String> = HashSet::new();
    for i in 0..100 {
        let owners = ring.owners(&format!("key{i}"), 1);
        primaries.insert(owners[0].id.clone());
    }

    // 100 keys over 3 nodes should touch every node
    assert_eq!(primaries.len(), 3);
}

#[test]
fn test_membership_change_preserves_relative_order() {
    let ring = ring_of(&["node1", "node2", "node3"]);

    let keys: Vec<String> = (0..200).map(|i| format!("key{i}")).collect();
    let before: Vec<Vec<String>> = keys
        .iter()
        .map(|k| ring.owners(k, 3).into_iter().map(|n| n.id).collect())
        .collect();

    ring.add_node("node4", "localhost:8084");

    for (key, old_order) in keys.iter().zip(&before) {
        let after: Vec<String> = ring
            .owners(key, 4)
            .into_iter()
            .map(|n| n.id)
            .filter(|id| id != "node4")
            .collect();
        // Filtering out the newcomer must restore the exact previous order
        assert_eq!(&after, old_order, "order changed for {key}");
    }
}

#[test]
fn test_primary_moves_only_when_newcomer_wins() {
    let ring = ring_of(&["node1", "node2", "node3"]);

    let keys: Vec<String> = (0..200).map(|i| format!("key{i}")).collect();
    let before: Vec<String> = keys.iter().map(|k| ring.owners(k, 1)[0].id.clone()).collect();

    ring.add_node("node4", "localhost:8084");

    for (key, old_primary) in keys.iter().zip(&before) {
        let new_primary = ring.owners(key, 1)[0].id.clone();
        if new_primary != *old_primary {
            assert_eq!(new_primary, "node4");
            assert!(score(key, "node4") > score(key, old_primary));
        }
    }
}

#[test]
fn test_concurrent_access() {
    let ring = Arc::new(Ring::new());

    let mut handles = Vec::new();
    for i in 0..5 {
        let ring = ring.clone();
        handles.push(std::thread::spawn(move || {
            ring.add_node(&format!("node{i}"), &format!("localhost:{}", 8080 + i));
            let owners = ring.owners("test-key", 2);
            let ids: HashSet<String> = owners.iter().map(|n| n.id.clone()).collect();
            assert_eq!(ids.len(), owners.len());
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(ring.node_count(), 5);
}
