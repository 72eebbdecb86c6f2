use md5::{Digest, Md5};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::types::Node;

/// Membership table plus the rendezvous-hashing resolver.
///
/// Membership changes take the writer lease; `owners` resolves placement
/// under a single reader lease so a concurrent add or remove can never
/// produce duplicates or omissions within one call. For a fixed membership
/// and key, `owners` is a pure function.
pub struct Ring {
    nodes: RwLock<HashMap<String, Node>>,
}

impl Ring {
    pub fn new() -> Self {
        Ring {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces a member.
    pub fn add_node(&self, id: &str, addr: &str) {
        self.nodes
            .write()
            .insert(id.to_owned(), Node::new(id, addr));
    }

    /// Removes a member; absent ids are a no-op.
    pub fn remove_node(&self, id: &str) {
        self.nodes.write().remove(id);
    }

    /// Snapshot of all members, in no particular order.
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    /// Returns up to `n` distinct replicas for `key`, highest score first.
    ///
    /// Scores are the big-endian first 8 bytes of `md5(key ∥ id)`; ties are
    /// broken by ascending id so the order is total. An empty membership
    /// yields an empty list; `n` larger than the membership yields every
    /// member.
    pub fn owners(&self, key: &str, n: usize) -> Vec<Node> {
        let nodes = self.nodes.read();
        if nodes.is_empty() || n == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(u64, &Node)> = nodes
            .values()
            .map(|node| (score(key, &node.id), node))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));

        scored
            .into_iter()
            .take(n.min(nodes.len()))
            .map(|(_, node)| node.clone())
            .collect()
    }
}

impl Default for Ring {
    fn default() -> Self {
        Self::new()
    }
}

/// Rendezvous score for one (key, node) pair.
pub(crate) fn score(key: &str, node_id: &str) -> u64 {
    let mut hasher = Md5::new();
    hasher.update(key.as_bytes());
    hasher.update(node_id.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("md5 digest is 16 bytes"))
}
