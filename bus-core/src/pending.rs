//! Deferred subscriptions naming a not-yet-registered publisher.

use parking_lot::Mutex;

use crate::node::NodeId;

/// One subscribe call that could not resolve its target at the time it was
/// made.
#[derive(Debug, Clone)]
struct Entry {
    sub_id: NodeId,
    target_name: String,
}

/// A FIFO of (subscriber_id, target_name) pairs. No priorities, no
/// deduplication — two identical entries may coexist if the same subscriber
/// issues the same pending subscribe twice.
#[derive(Default)]
pub struct PendingTable {
    entries: Mutex<Vec<Entry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        PendingTable {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn enqueue(&self, sub_id: NodeId, target_name: &str) {
        self.entries.lock().push(Entry {
            sub_id,
            target_name: target_name.to_string(),
        });
        tracing::trace!(sub_id, target_name, "subscribe deferred, target not found");
    }

    /// Remove and return, in FIFO order, every entry naming `target_name`.
    /// Called once per successful registration under that name.
    pub fn drain(&self, target_name: &str) -> Vec<NodeId> {
        let mut guard = self.entries.lock();
        let mut drained = Vec::new();
        guard.retain(|e| {
            if e.target_name == target_name {
                drained.push(e.sub_id);
                false
            } else {
                true
            }
        });
        drained
    }

    /// Discard every entry for a subscriber that has since been removed.
    pub fn purge_subscriber(&self, sub_id: NodeId) {
        self.entries.lock().retain(|e| e.sub_id != sub_id);
    }

    /// Discard every entry at once. Used when the owning instance is torn
    /// down.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
