//! The node itself: a passive container whose semantics are defined by the
//! registry, graph and delivery engine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::{Callback, UserData};
use crate::flags::{EventMask, NodeFlags};

/// Monotonic node identifier. Never reused within one bus instance's
/// lifetime.
pub type NodeId = u64;

/// Sentinel meaning "not on bus" — the all-ones value of the id type.
pub const INVALID_ID: NodeId = NodeId::MAX;

/// Caller-supplied configuration for a new node.
#[derive(Clone)]
pub struct NodeParams {
    /// Declared byte length of Publish/Pull payloads. 0 means "variable",
    /// only accepted for non-cached nodes.
    pub payload_size: usize,
    /// Declared byte length required for inbound Notify when
    /// `NOTIFY_SIZE_CHECK` is set.
    pub notify_size: usize,
    pub flags: NodeFlags,
    pub event_mask: EventMask,
    pub callback: Option<Callback>,
    pub user_data: Option<UserData>,
}

impl Default for NodeParams {
    fn default() -> Self {
        NodeParams {
            payload_size: 0,
            notify_size: 0,
            flags: NodeFlags::empty(),
            event_mask: EventMask::empty(),
            callback: None,
            user_data: None,
        }
    }
}

/// A node registered on a bus. Owned by the registry while registered; the
/// subscription graph and pending table refer to it only by id.
pub struct Node {
    name: String,
    /// `INVALID_ID` before registration completes and after removal; the
    /// assigned id otherwise. Mirrors the original's `id(INVALID_ID)` reset
    /// on teardown so a strong reference outliving removal still observes
    /// "gone".
    id: AtomicU64,
    registered: AtomicBool,
    payload_size: usize,
    notify_size: usize,
    flags: NodeFlags,
    event_mask: EventMask,
    callback: Option<Callback>,
    user_data: Option<UserData>,
    cache: Option<RwLock<Vec<u8>>>,
}

impl Node {
    pub(crate) fn new(name: String, mut params: NodeParams) -> Node {
        if params.callback.is_none() {
            params.event_mask = EventMask::empty();
        }
        let using_cache = params.flags.contains(NodeFlags::CACHED) && params.payload_size > 0;
        let cache = if using_cache {
            Some(RwLock::new(vec![0u8; params.payload_size]))
        } else {
            None
        };
        Node {
            name,
            id: AtomicU64::new(INVALID_ID),
            registered: AtomicBool::new(false),
            payload_size: params.payload_size,
            notify_size: params.notify_size,
            flags: params.flags,
            event_mask: params.event_mask,
            callback: params.callback,
            user_data: params.user_data,
            cache,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable identifier while registered; `INVALID_ID` once removed.
    pub fn my_id(&self) -> NodeId {
        self.id.load(Ordering::Acquire)
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    pub(crate) fn set_id(&self, id: NodeId) {
        self.id.store(id, Ordering::Release);
        self.registered.store(true, Ordering::Release);
    }

    pub(crate) fn clear_id(&self) {
        self.registered.store(false, Ordering::Release);
        self.id.store(INVALID_ID, Ordering::Release);
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn notify_size(&self) -> usize {
        self.notify_size
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Copy `buf` into the cache under the writer lock. Caller is
    /// responsible for having already checked `buf.len() == payload_size`.
    pub(crate) fn write_cache(&self, buf: &[u8]) {
        if let Some(cache) = &self.cache {
            let mut guard = cache.write();
            guard.copy_from_slice(buf);
        }
    }

    /// Copy the cache into `out` under the reader lock. Returns `false` if
    /// this node has no cache.
    pub(crate) fn read_cache_into(&self, out: &mut [u8]) -> bool {
        match &self.cache {
            Some(cache) => {
                let guard = cache.read();
                out.copy_from_slice(&guard);
                true
            }
            None => false,
        }
    }

    /// Snapshot the cache contents (used for the synthetic LATCHED delivery).
    pub(crate) fn snapshot_cache(&self) -> Option<Vec<u8>> {
        self.cache.as_ref().map(|c| c.read().clone())
    }
}
