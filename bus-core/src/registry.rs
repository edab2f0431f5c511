//! Name/id directory of nodes on one bus instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::MAX_NODE_NAME_LEN;
use crate::error::{BusError, BusResult};
use crate::flags::NodeFlags;
use crate::node::{Node, NodeId, NodeParams};

/// Either a node name or a node id — the two ways every operation accepts a
/// target (mirrors the original's by-name/by-id method overloads).
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Name(&'a str),
    Id(NodeId),
}

impl<'a> From<&'a str> for NodeRef<'a> {
    fn from(name: &'a str) -> Self {
        NodeRef::Name(name)
    }
}

impl From<NodeId> for NodeRef<'static> {
    fn from(id: NodeId) -> Self {
        NodeRef::Id(id)
    }
}

fn validate_params(params: &NodeParams) -> BusResult<()> {
    if params.flags.contains(NodeFlags::CACHED) && params.payload_size == 0 {
        return Err(BusError::Invalid);
    }
    if params.flags.contains(NodeFlags::LATCHED) && !params.flags.contains(NodeFlags::CACHED) {
        return Err(BusError::Invalid);
    }
    if params.flags.contains(NodeFlags::NOTIFY_SIZE_CHECK) && params.notify_size == 0 {
        return Err(BusError::Invalid);
    }
    Ok(())
}

fn validate_name(name: &str) -> BusResult<()> {
    if name.is_empty() || name.len() > MAX_NODE_NAME_LEN {
        return Err(BusError::Invalid);
    }
    Ok(())
}

#[derive(Default)]
struct Inner {
    by_name: HashMap<String, NodeId>,
    by_id: HashMap<NodeId, Arc<Node>>,
}

/// Maps node name → node handle and node id → node handle; allocates
/// monotonic ids. The only component that assigns ids.
pub struct Registry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: RwLock::new(Inner::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate, assign a fresh id and register a new node under `name`.
    pub fn create_node(&self, name: &str, params: NodeParams) -> BusResult<Arc<Node>> {
        validate_name(name)?;
        validate_params(&params)?;

        let mut inner = self.inner.write();
        if inner.by_name.contains_key(name) {
            return Err(BusError::Exist);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let node = Arc::new(Node::new(name.to_string(), params));
        node.set_id(id);
        inner.by_name.insert(name.to_string(), id);
        inner.by_id.insert(id, node.clone());
        tracing::debug!(node_id = id, name, "node registered");
        Ok(node)
    }

    pub fn lookup(&self, target: NodeRef<'_>) -> Option<(NodeId, Arc<Node>)> {
        let inner = self.inner.read();
        match target {
            NodeRef::Name(name) => {
                let id = *inner.by_name.get(name)?;
                let node = inner.by_id.get(&id)?.clone();
                Some((id, node))
            }
            NodeRef::Id(id) => {
                let node = inner.by_id.get(&id)?.clone();
                Some((id, node))
            }
        }
    }

    pub fn lookup_by_id(&self, id: NodeId) -> Option<Arc<Node>> {
        self.inner.read().by_id.get(&id).cloned()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<(NodeId, Arc<Node>)> {
        self.lookup(NodeRef::Name(name))
    }

    /// Remove a node from both indexes and mark its id invalid. Does not
    /// touch the subscription graph — callers detach it first.
    pub fn remove(&self, target: NodeRef<'_>) -> BusResult<Arc<Node>> {
        let mut inner = self.inner.write();
        let id = match target {
            NodeRef::Name(name) => *inner.by_name.get(name).ok_or(BusError::NotFound)?,
            NodeRef::Id(id) => id,
        };
        let node = inner.by_id.remove(&id).ok_or(BusError::NotFound)?;
        inner.by_name.remove(node.name());
        node.clear_id();
        tracing::debug!(node_id = id, name = node.name(), "node removed");
        Ok(node)
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Deregister every node at once, invalidating each one's id. Used when
    /// the owning instance itself is torn down: a `NodeHandle` held past
    /// that point must observe the same "gone" state a single `remove`
    /// would have produced.
    pub fn clear_all(&self) {
        let mut inner = self.inner.write();
        for node in inner.by_id.values() {
            node.clear_id();
        }
        inner.by_id.clear();
        inner.by_name.clear();
    }

    /// Snapshot of all registered (id, name) pairs, for diagnostics.
    pub fn debug_dump(&self) -> Vec<(NodeId, String)> {
        let inner = self.inner.read();
        inner
            .by_id
            .iter()
            .map(|(id, node)| (*id, node.name().to_string()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
