//! Procedural surface: callers own node storage (a [`ProcNode`]) and drive
//! its lifecycle through explicit Init/PushBack/Remove/Deinit calls, a
//! struct-plus-functions shape built on owned Rust values instead of raw
//! pointers.
//!
//! Every operation returns a signed `i32` result code (`ErrorCode`'s
//! underlying representation); success is `0`, informational positives are
//! allowed, and callback-sourced values from `pull`/`notify` may fall
//! outside the named vocabulary entirely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bus_core::{
    config::DEFAULT_INSTANCE_NAME, directory, error_string as core_error_string, BusInstance,
    ErrorCode, Node, NodeId, NodeParams, NodeRef, PullOutcome, SubscribeOutcome,
};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialise the process-wide default bus (creating its dummy node).
/// Returns `INITIALIZED` if already initialised.
pub fn init() -> i32 {
    if INITIALIZED.swap(true, Ordering::AcqRel) {
        return ErrorCode::INITIALIZED.0;
    }
    directory::default_instance();
    ErrorCode::OK.0
}

/// Tear down the default bus. Returns `NOTINITIALIZED` if `init` was never
/// called (or was already undone).
pub fn deinit() -> i32 {
    if !INITIALIZED.swap(false, Ordering::AcqRel) {
        return ErrorCode::NOTINITIALIZED.0;
    }
    directory::remove(DEFAULT_INSTANCE_NAME);
    ErrorCode::OK.0
}

fn bus() -> Arc<BusInstance> {
    directory::default_instance()
}

pub fn node_count() -> usize {
    bus().node_count()
}

pub fn search_by_name(name: &str) -> Option<NodeId> {
    bus().lookup(NodeRef::Name(name)).map(|(id, _)| id)
}

pub fn error_string(code: i32) -> &'static str {
    core_error_string(ErrorCode(code))
}

/// Caller-owned node storage. Starts out uninitialised; must be taken
/// through [`init_node`] then [`push_back_node`] before it can be used in
/// any bus operation.
#[derive(Default)]
pub struct ProcNode {
    name: String,
    params: Option<NodeParams>,
    handle: Option<Arc<Node>>,
}

impl ProcNode {
    pub fn new() -> ProcNode {
        ProcNode::default()
    }

    pub fn my_id(&self) -> Option<NodeId> {
        self.handle.as_ref().map(|n| n.my_id())
    }

    fn handle(&self) -> Result<&Arc<Node>, i32> {
        self.handle.as_ref().ok_or(ErrorCode::NOTINITIALIZED.0)
    }
}

/// Stage a node's configuration without registering it on the bus yet.
/// Idempotent-to-error: only the first call on a given `ProcNode` succeeds.
pub fn init_node(node: &mut ProcNode, name: &str, params: NodeParams) -> i32 {
    if node.params.is_some() {
        return ErrorCode::INITIALIZED.0;
    }
    node.name = name.to_string();
    node.params = Some(params);
    ErrorCode::OK.0
}

/// Register a staged node on the bus, making it addressable.
pub fn push_back_node(node: &mut ProcNode) -> i32 {
    if node.handle.is_some() {
        return ErrorCode::INITIALIZED.0;
    }
    let Some(params) = node.params.clone() else {
        return ErrorCode::NOTINITIALIZED.0;
    };
    match bus().create_node(&node.name, params) {
        Ok(handle) => {
            node.handle = Some(handle);
            ErrorCode::OK.0
        }
        Err(e) => ErrorCode::from(e).0,
    }
}

/// Detach and deregister the node from the bus. The `ProcNode`'s staged
/// params survive (it can be pushed back onto a different bus state after
/// a fresh `init_node`), but its handle is cleared.
pub fn remove_node(node: &mut ProcNode) -> i32 {
    let Some(handle) = node.handle.take() else {
        return ErrorCode::NOTFOUND.0;
    };
    let result = bus().remove_node(NodeRef::Id(handle.my_id()));
    if let Err(e) = result {
        node.handle = Some(handle);
        return ErrorCode::from(e).0;
    }
    ErrorCode::OK.0
}

/// Release the `ProcNode`'s staged configuration. Refuses while the node
/// is still registered — call [`remove_node`] first.
pub fn deinit_node(node: &mut ProcNode) -> i32 {
    if node.handle.is_some() {
        return ErrorCode::BUSY.0;
    }
    if node.params.is_none() {
        return ErrorCode::NOTINITIALIZED.0;
    }
    node.params = None;
    node.name.clear();
    ErrorCode::OK.0
}

pub fn pub_count(node: &ProcNode) -> i32 {
    match node.handle() {
        Ok(h) => bus().pub_count(h.my_id()) as i32,
        Err(code) => code,
    }
}

pub fn sub_count(node: &ProcNode) -> i32 {
    match node.handle() {
        Ok(h) => bus().sub_count(h.my_id()) as i32,
        Err(code) => code,
    }
}

pub fn subscribe(node: &ProcNode, pub_name: &str) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().subscribe(id, pub_name) {
        Ok(SubscribeOutcome::Subscribed) => ErrorCode::OK.0,
        Ok(SubscribeOutcome::Pending) => ErrorCode::PENDING.0,
        Err(e) => ErrorCode::from(e).0,
    }
}

pub fn unsubscribe(node: &ProcNode, target: NodeRef<'_>) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().unsubscribe(id, target) {
        Ok(()) => ErrorCode::OK.0,
        Err(e) => ErrorCode::from(e).0,
    }
}

pub fn publish(node: &ProcNode, buf: &[u8]) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().publish(id, buf) {
        Ok(()) => ErrorCode::OK.0,
        Err(e) => ErrorCode::from(e).0,
    }
}

pub fn publish_signal(node: &ProcNode, buf: &[u8]) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().publish_signal(id, buf) {
        Ok(()) => ErrorCode::OK.0,
        Err(e) => ErrorCode::from(e).0,
    }
}

/// Returns `CACHE_PULLED` on a cache hit, the target callback's own return
/// value on a callback hit, or an error code.
pub fn pull(node: &ProcNode, target: NodeRef<'_>, buf: &mut [u8]) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().pull(id, target, buf) {
        Ok(PullOutcome::CachePulled) => ErrorCode::CACHE_PULLED.0,
        Ok(PullOutcome::Callback(code)) => code,
        Err(e) => ErrorCode::from(e).0,
    }
}

/// Pull performed with the reserved dummy node as sender.
pub fn pull_anon(target: NodeRef<'_>, buf: &mut [u8]) -> i32 {
    match bus().pull_anon(target, buf) {
        Ok(PullOutcome::CachePulled) => ErrorCode::CACHE_PULLED.0,
        Ok(PullOutcome::Callback(code)) => code,
        Err(e) => ErrorCode::from(e).0,
    }
}

/// Returns the target callback's own return value, or an error code.
pub fn notify(node: &ProcNode, target: NodeRef<'_>, buf: &[u8]) -> i32 {
    let id = match node.handle() {
        Ok(h) => h.my_id(),
        Err(code) => return code,
    };
    match bus().notify(id, target, buf) {
        Ok(code) => code,
        Err(e) => ErrorCode::from(e).0,
    }
}
