use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A cache node as seen by the placement ring.
///
/// Identity is the stable `id` string; the transport address is opaque
/// payload carried along for whoever dials the node. Two nodes are equal
/// iff their identities are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub addr: String,
}

impl Node {
    pub fn new(id: impl Into<String>, addr: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            addr: addr.into(),
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
