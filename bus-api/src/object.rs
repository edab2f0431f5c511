//! Object surface: the library owns node storage, callers get back
//! reference-counted handles.

use std::sync::Arc;

use bus_core::{
    directory, BusError, BusInstance, ErrorCode, Node, NodeId, NodeParams, NodeRef, PullOutcome,
    SubscribeOutcome,
};

fn code_of<T>(result: Result<T, BusError>) -> i32 {
    match result {
        Ok(_) => ErrorCode::OK.0,
        Err(e) => ErrorCode::from(e).0,
    }
}

/// A named bus instance, reference-counted. Cloning is cheap: clones refer
/// to the same underlying [`BusInstance`].
#[derive(Clone)]
pub struct BusInstanceHandle {
    inner: Arc<BusInstance>,
}

/// Fetch (or lazily create) the instance named `name`.
pub fn get_instance(name: &str) -> BusInstanceHandle {
    BusInstanceHandle { inner: directory::get_or_create(name) }
}

/// The `"default"` instance.
pub fn default_instance() -> BusInstanceHandle {
    BusInstanceHandle { inner: directory::default_instance() }
}

/// Drop an instance from the process-wide directory.
pub fn delete_instance(name: &str) -> bool {
    directory::remove(name)
}

impl BusInstanceHandle {
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Create and register a new node, returning an owning handle to it.
    pub fn new_node(&self, name: &str, params: NodeParams) -> Result<NodeHandle, ErrorCode> {
        self.inner
            .create_node(name, params)
            .map(|node| NodeHandle { bus: self.inner.clone(), node })
            .map_err(ErrorCode::from)
    }

    pub fn remove_node(&self, target: NodeRef<'_>) -> i32 {
        code_of(self.inner.remove_node(target))
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<(NodeId, NodeHandle)> {
        let (id, node) = self.inner.lookup(NodeRef::Name(name))?;
        Some((id, NodeHandle { bus: self.inner.clone(), node }))
    }

    pub fn get_node_by_id(&self, id: NodeId) -> Option<NodeHandle> {
        let (_, node) = self.inner.lookup(NodeRef::Id(id))?;
        Some(NodeHandle { bus: self.inner.clone(), node })
    }

    /// Pull performed with the reserved dummy node as sender — no node
    /// handle of your own required.
    pub fn pull_anon(&self, target: NodeRef<'_>, buf: &mut [u8]) -> i32 {
        match self.inner.pull_anon(target, buf) {
            Ok(PullOutcome::CachePulled) => ErrorCode::CACHE_PULLED.0,
            Ok(PullOutcome::Callback(code)) => code,
            Err(e) => ErrorCode::from(e).0,
        }
    }

    pub fn debug_dump(&self) -> Vec<(NodeId, String)> {
        self.inner.debug_dump()
    }
}

/// A registered node, owned by the bus instance it came from. Dropping the
/// last handle does not remove the node from the bus — call
/// [`NodeHandle::remove`] (or the instance's `remove_node`) explicitly.
#[derive(Clone)]
pub struct NodeHandle {
    bus: Arc<BusInstance>,
    node: Arc<Node>,
}

impl NodeHandle {
    pub fn my_id(&self) -> NodeId {
        self.node.my_id()
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn sub_count(&self) -> usize {
        self.bus.sub_count(self.node.my_id())
    }

    pub fn pub_count(&self) -> usize {
        self.bus.pub_count(self.node.my_id())
    }

    /// Subscribe this node to the publisher named `pub_name`. Returns
    /// `ErrorCode::OK`, `ErrorCode::PENDING`, or an error code.
    pub fn subscribe(&self, pub_name: &str) -> i32 {
        match self.bus.subscribe(self.node.my_id(), pub_name) {
            Ok(SubscribeOutcome::Subscribed) => ErrorCode::OK.0,
            Ok(SubscribeOutcome::Pending) => ErrorCode::PENDING.0,
            Err(e) => ErrorCode::from(e).0,
        }
    }

    pub fn unsubscribe(&self, target: NodeRef<'_>) -> i32 {
        code_of(self.bus.unsubscribe(self.node.my_id(), target))
    }

    pub fn publish(&self, buf: &[u8]) -> i32 {
        code_of(self.bus.publish(self.node.my_id(), buf))
    }

    pub fn publish_signal(&self, buf: &[u8]) -> i32 {
        code_of(self.bus.publish_signal(self.node.my_id(), buf))
    }

    /// Returns `ErrorCode::CACHE_PULLED` on a cache hit, the target
    /// callback's own return value on a callback hit, or an error code.
    pub fn pull(&self, target: NodeRef<'_>, buf: &mut [u8]) -> i32 {
        match self.bus.pull(self.node.my_id(), target, buf) {
            Ok(PullOutcome::CachePulled) => ErrorCode::CACHE_PULLED.0,
            Ok(PullOutcome::Callback(code)) => code,
            Err(e) => ErrorCode::from(e).0,
        }
    }

    /// Returns the target callback's own return value, or an error code.
    pub fn notify(&self, target: NodeRef<'_>, buf: &[u8]) -> i32 {
        match self.bus.notify(self.node.my_id(), target, buf) {
            Ok(code) => code,
            Err(e) => ErrorCode::from(e).0,
        }
    }
}
