//! Bidirectional subscriber/publisher relation.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::node::NodeId;

#[derive(Default)]
struct Inner {
    /// subscriber -> publisher(s), insertion order preserved.
    pubs_of: HashMap<NodeId, Vec<NodeId>>,
    /// publisher -> subscriber(s), insertion order preserved.
    subs_of: HashMap<NodeId, Vec<NodeId>>,
}

/// Whether adding an edge mutated the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEdge {
    Added,
    AlreadyExists,
}

/// The subscription relation: a set of (subscriber_id, publisher_id) pairs,
/// indexed in both directions. Self-edges and duplicates are rejected by
/// the caller (the engine), not by the graph itself — the graph is a pure
/// data structure.
pub struct SubscriptionGraph {
    inner: RwLock<Inner>,
}

impl SubscriptionGraph {
    pub fn new() -> Self {
        SubscriptionGraph {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn contains(&self, sub_id: NodeId, pub_id: NodeId) -> bool {
        let inner = self.inner.read();
        inner
            .pubs_of
            .get(&sub_id)
            .map(|v| v.contains(&pub_id))
            .unwrap_or(false)
    }

    /// Add the (sub_id, pub_id) pair to both indexes if absent.
    pub fn add_edge(&self, sub_id: NodeId, pub_id: NodeId) -> AddEdge {
        let mut inner = self.inner.write();
        let already = inner
            .pubs_of
            .get(&sub_id)
            .map(|v| v.contains(&pub_id))
            .unwrap_or(false);
        if already {
            return AddEdge::AlreadyExists;
        }
        inner.pubs_of.entry(sub_id).or_default().push(pub_id);
        inner.subs_of.entry(pub_id).or_default().push(sub_id);
        AddEdge::Added
    }

    pub fn remove_edge(&self, sub_id: NodeId, pub_id: NodeId) {
        let mut inner = self.inner.write();
        if let Some(v) = inner.pubs_of.get_mut(&sub_id) {
            v.retain(|&p| p != pub_id);
        }
        if let Some(v) = inner.subs_of.get_mut(&pub_id) {
            v.retain(|&s| s != sub_id);
        }
    }

    /// Remove every pair mentioning `id`, in either direction. Called when
    /// a node is removed from the bus.
    pub fn detach(&self, id: NodeId) {
        let mut inner = self.inner.write();
        if let Some(pubs) = inner.pubs_of.remove(&id) {
            for p in pubs {
                if let Some(v) = inner.subs_of.get_mut(&p) {
                    v.retain(|&s| s != id);
                }
            }
        }
        if let Some(subs) = inner.subs_of.remove(&id) {
            for s in subs {
                if let Some(v) = inner.pubs_of.get_mut(&s) {
                    v.retain(|&p| p != id);
                }
            }
        }
    }

    /// Snapshot of subscribers attached to `pub_id`, in subscribe order.
    /// Taken under the graph lock and returned as an owned copy so callers
    /// don't hold the lock during delivery.
    pub fn subscribers_of(&self, pub_id: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .subs_of
            .get(&pub_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn publishers_of(&self, sub_id: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .pubs_of
            .get(&sub_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn sub_count(&self, pub_id: NodeId) -> usize {
        self.inner
            .read()
            .subs_of
            .get(&pub_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn pub_count(&self, sub_id: NodeId) -> usize {
        self.inner
            .read()
            .pubs_of
            .get(&sub_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drop every edge at once. Used when the owning instance is torn down.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.pubs_of.clear();
        inner.subs_of.clear();
    }
}

impl Default for SubscriptionGraph {
    fn default() -> Self {
        Self::new()
    }
}
