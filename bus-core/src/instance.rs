//! Bus instance: owns a registry, a subscription graph, a pending table and
//! the dummy node, and implements every cross-component operation —
//! subscribe/unsubscribe and publish/pull/notify.

use std::sync::Arc;

use crate::config::DUMMY_NODE_NAME;
use crate::error::{BusError, BusResult};
use crate::event::{EventData, EventKind, EventParam};
use crate::flags::EventMask;
use crate::graph::{AddEdge, SubscriptionGraph};
use crate::node::{Node, NodeId, NodeParams};
use crate::pending::PendingTable;
use crate::registry::{NodeRef, Registry};

/// Result of a successful Subscribe: either the edge is live, or the
/// target wasn't registered yet and the request was deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    Pending,
}

/// Result of a successful Pull: whether it was satisfied from the cache
/// (no callback invoked) or by invoking the target's callback, in which
/// case the callback's own return value is carried along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    CachePulled,
    Callback(i32),
}

/// One named bus: a registry, a subscription graph, a pending table, and
/// the always-present dummy node used as the sender identity for anonymous
/// operations.
pub struct BusInstance {
    name: String,
    registry: Registry,
    graph: SubscriptionGraph,
    pending: PendingTable,
    dummy_id: NodeId,
}

impl BusInstance {
    /// Construct a fresh instance with its dummy node already registered.
    /// Mirrors the original's invariant that `node_count() == 1` right
    /// after init.
    pub fn new(name: impl Into<String>) -> BusInstance {
        let registry = Registry::new();
        let dummy = registry
            .create_node(DUMMY_NODE_NAME, NodeParams::default())
            .expect("dummy node registration cannot fail");
        let dummy_id = dummy.my_id();
        BusInstance {
            name: name.into(),
            registry,
            graph: SubscriptionGraph::new(),
            pending: PendingTable::new(),
            dummy_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dummy_id(&self) -> NodeId {
        self.dummy_id
    }

    pub fn node_count(&self) -> usize {
        self.registry.node_count()
    }

    pub fn lookup(&self, target: NodeRef<'_>) -> Option<(NodeId, Arc<Node>)> {
        self.registry.lookup(target)
    }

    pub fn debug_dump(&self) -> Vec<(NodeId, String)> {
        self.registry.debug_dump()
    }

    /// Register a new node and drain any pending subscriptions naming it.
    pub fn create_node(&self, name: &str, params: NodeParams) -> BusResult<Arc<Node>> {
        let node = self.registry.create_node(name, params)?;
        self.drain_pending_for(name);
        Ok(node)
    }

    fn drain_pending_for(&self, name: &str) {
        for sub_id in self.pending.drain(name) {
            // The original subscriber to a pending entry has already seen
            // PENDING returned to its own caller; this reissue's outcome is
            // intentionally not reported anywhere.
            let _ = self.subscribe(sub_id, name);
        }
    }

    /// Detach from the graph, purge pending entries naming this id, then
    /// remove from the registry.
    pub fn remove_node(&self, target: NodeRef<'_>) -> BusResult<()> {
        let (id, node) = self.registry.lookup(target).ok_or(BusError::NotFound)?;
        self.graph.detach(id);
        self.pending.purge_subscriber(id);
        self.registry.remove(NodeRef::Id(id))?;
        tracing::debug!(node_id = id, name = node.name(), "node torn down");
        Ok(())
    }

    /// Tear down every node still registered on this instance at once:
    /// drop all subscription edges, discard all pending entries, and
    /// invalidate every node's id. Called when the instance itself is
    /// removed from the process-wide directory so that any `NodeHandle`
    /// held past that point observes the same "gone" state an individual
    /// `remove_node` would have produced.
    pub fn deinit_all_nodes(&self) {
        self.graph.clear();
        self.pending.clear();
        self.registry.clear_all();
        tracing::debug!(instance = self.name.as_str(), "all nodes deinitialised");
    }

    pub fn sub_count(&self, pub_id: NodeId) -> usize {
        self.graph.sub_count(pub_id)
    }

    pub fn pub_count(&self, sub_id: NodeId) -> usize {
        self.graph.pub_count(sub_id)
    }

    /// Subscribe `sub_id` to the publisher named `pub_name`.
    pub fn subscribe(&self, sub_id: NodeId, pub_name: &str) -> BusResult<SubscribeOutcome> {
        let subscriber = self.registry.lookup_by_id(sub_id).ok_or(BusError::NotFound)?;
        let wants_publish_family = subscriber.event_mask().intersects(
            EventMask::PUBLISH | EventMask::PUBLISH_SIGNAL | EventMask::LATCHED,
        );
        if !wants_publish_family {
            return Err(BusError::NoSupport);
        }

        let publisher = match self.registry.lookup_by_name(pub_name) {
            Some((_, node)) => node,
            None => {
                self.pending.enqueue(sub_id, pub_name);
                return Ok(SubscribeOutcome::Pending);
            }
        };
        let pub_id = publisher.my_id();
        if pub_id == sub_id {
            return Err(BusError::Invalid);
        }
        if self.graph.add_edge(sub_id, pub_id) == AddEdge::AlreadyExists {
            return Err(BusError::Exist);
        }
        tracing::trace!(sub_id, pub_id, "subscription edge added");

        if publisher.flags().contains(crate::flags::NodeFlags::LATCHED)
            && subscriber.event_mask().contains(EventMask::LATCHED)
        {
            if let Some(cached) = publisher.snapshot_cache() {
                deliver(&subscriber, pub_id, sub_id, EventKind::Latched, EventData::Read(&cached));
            }
        }
        Ok(SubscribeOutcome::Subscribed)
    }

    pub fn unsubscribe(&self, sub_id: NodeId, target: NodeRef<'_>) -> BusResult<()> {
        let pub_id = match target {
            NodeRef::Id(id) => id,
            NodeRef::Name(name) => self.registry.lookup_by_name(name).ok_or(BusError::NotFound)?.0,
        };
        if !self.graph.contains(sub_id, pub_id) {
            return Err(BusError::NotFound);
        }
        self.graph.remove_edge(sub_id, pub_id);
        Ok(())
    }

    /// Publish(sender, buf): update cache if configured, snapshot
    /// subscribers, invoke each in insertion order. Returns `Ok(())`
    /// regardless of individual callback outcomes.
    pub fn publish(&self, sender_id: NodeId, buf: &[u8]) -> BusResult<()> {
        self.do_publish(sender_id, EventKind::Publish, buf, true)
    }

    /// Publish-Signal(sender, buf): same size-check and cache update as
    /// Publish, but subscribers are dispatched a (null, 0) payload and the
    /// event kind is PUBLISH_SIGNAL.
    pub fn publish_signal(&self, sender_id: NodeId, buf: &[u8]) -> BusResult<()> {
        self.do_publish(sender_id, EventKind::PublishSignal, buf, false)
    }

    fn do_publish(&self, sender_id: NodeId, kind: EventKind, buf: &[u8], deliver_payload: bool) -> BusResult<()> {
        let sender = self.registry.lookup_by_id(sender_id).ok_or(BusError::NotFound)?;
        if sender.payload_size() > 0 && buf.len() != sender.payload_size() {
            return Err(BusError::SizeMismatch);
        }
        if sender.has_cache() {
            sender.write_cache(buf);
        }
        let wanted = match kind {
            EventKind::Publish => EventMask::PUBLISH,
            EventKind::PublishSignal => EventMask::PUBLISH_SIGNAL,
            _ => unreachable!("do_publish only dispatches Publish/PublishSignal"),
        };

        let subscribers = self.graph.subscribers_of(sender_id);
        tracing::trace!(sender_id, fanout = subscribers.len(), ?kind, "publish dispatch");
        for sub_id in subscribers {
            let Some(subscriber) = self.registry.lookup_by_id(sub_id) else {
                continue;
            };
            if !subscriber.event_mask().contains(wanted) {
                if cfg!(debug_assertions) {
                    tracing::warn!(
                        sender_id,
                        receiver_id = sub_id,
                        ?kind,
                        "skipping subscriber whose event_mask doesn't include this event kind"
                    );
                }
                continue;
            }
            let data = if deliver_payload { EventData::Read(buf) } else { EventData::None };
            deliver(&subscriber, sender_id, sub_id, kind, data);
        }
        Ok(())
    }

    /// Pull(puller, target, buf): cache read if eligible, else invoke the
    /// target's PULL callback.
    pub fn pull(&self, puller_id: NodeId, target: NodeRef<'_>, buf: &mut [u8]) -> BusResult<PullOutcome> {
        self.registry.lookup_by_id(puller_id).ok_or(BusError::NotFound)?;
        let (target_id, target_node) = self.registry.lookup(target).ok_or(BusError::NotFound)?;

        if target_node.has_cache() {
            if target_node.payload_size() != buf.len() {
                return Err(BusError::SizeMismatch);
            }
            target_node.read_cache_into(buf);
            tracing::trace!(puller_id, target_id, "pull satisfied from cache");
            return Ok(PullOutcome::CachePulled);
        }

        if !target_node.event_mask().contains(EventMask::PULL) {
            if cfg!(debug_assertions) {
                tracing::warn!(
                    puller_id,
                    target_id,
                    "skipping pull: target's event_mask doesn't include PULL"
                );
            }
            return Err(BusError::NoSupport);
        }
        let code = deliver_write(&target_node, puller_id, target_id, EventKind::Pull, buf)
            .ok_or(BusError::NoSupport)?;
        Ok(PullOutcome::Callback(code))
    }

    /// Pull performed anonymously, with the reserved dummy node standing in
    /// as the sender.
    pub fn pull_anon(&self, target: NodeRef<'_>, buf: &mut [u8]) -> BusResult<PullOutcome> {
        self.pull(self.dummy_id, target, buf)
    }

    /// Notify(sender, target, buf): size-checked directed delivery,
    /// surfacing the target callback's own return value.
    pub fn notify(&self, sender_id: NodeId, target: NodeRef<'_>, buf: &[u8]) -> BusResult<i32> {
        self.registry.lookup_by_id(sender_id).ok_or(BusError::NotFound)?;
        let (target_id, target_node) = self.registry.lookup(target).ok_or(BusError::NotFound)?;

        if target_node
            .flags()
            .contains(crate::flags::NodeFlags::NOTIFY_SIZE_CHECK)
            && buf.len() != target_node.notify_size()
        {
            return Err(BusError::SizeMismatch);
        }
        if !target_node.event_mask().contains(EventMask::NOTIFY) {
            if cfg!(debug_assertions) {
                tracing::warn!(
                    sender_id,
                    target_id,
                    "skipping notify: target's event_mask doesn't include NOTIFY"
                );
            }
            return Err(BusError::NoSupport);
        }
        deliver(&target_node, sender_id, target_id, EventKind::Notify, EventData::Read(buf))
            .ok_or(BusError::NoSupport)
    }
}

/// Invoke `receiver`'s callback, if any, with a read-only or signal payload.
/// Returns `None` if the receiver has no callback to invoke.
fn deliver(receiver: &Node, sender_id: NodeId, receiver_id: NodeId, kind: EventKind, data: EventData<'_>) -> Option<i32> {
    let callback = receiver.callback()?;
    let user_data = receiver.user_data();
    let len = data.len();
    let code = callback(EventParam {
        event: kind,
        sender: sender_id,
        receiver: receiver_id,
        data,
        user_data,
    });
    tracing::trace!(sender_id, receiver_id, ?kind, len, code, "event delivered");
    Some(code)
}

/// Like [`deliver`] but for PULL, which hands the callback a writable
/// buffer to fill.
fn deliver_write(receiver: &Node, sender_id: NodeId, receiver_id: NodeId, kind: EventKind, buf: &mut [u8]) -> Option<i32> {
    let callback = receiver.callback()?;
    let user_data = receiver.user_data();
    let len = buf.len();
    let code = callback(EventParam {
        event: kind,
        sender: sender_id,
        receiver: receiver_id,
        data: EventData::Write(buf),
        user_data,
    });
    tracing::trace!(sender_id, receiver_id, ?kind, len, code, "event delivered");
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Callback;
    use crate::flags::NodeFlags;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorded {
        calls: Vec<(EventKind, NodeId, NodeId, Vec<u8>)>,
    }

    fn recording_callback() -> (Callback, Arc<Mutex<Recorded>>) {
        let log = Arc::new(Mutex::new(Recorded::default()));
        let captured = log.clone();
        let cb: Callback = Arc::new(move |p: EventParam<'_>| {
            let bytes = match &p.data {
                EventData::Read(b) => b.to_vec(),
                EventData::Write(b) => b.to_vec(),
                EventData::None => Vec::new(),
            };
            captured.lock().calls.push((p.event, p.sender, p.receiver, bytes));
            0
        });
        (cb, log)
    }

    #[test]
    fn s1_simple_publish() {
        let bus = BusInstance::new("t");
        let a = bus.create_node("A", NodeParams { payload_size: 4, ..Default::default() }).unwrap();
        let (cb, log) = recording_callback();
        let b = bus
            .create_node(
                "B",
                NodeParams {
                    event_mask: EventMask::PUBLISH,
                    callback: Some(cb),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(bus.subscribe(b.my_id(), "A").unwrap(), SubscribeOutcome::Subscribed);
        bus.publish(a.my_id(), &[1, 2, 3, 4]).unwrap();
        let calls = log.lock().calls.clone();
        assert_eq!(calls, vec![(EventKind::Publish, a.my_id(), b.my_id(), vec![1, 2, 3, 4])]);
    }

    #[test]
    fn s2_pull_from_cache() {
        let bus = BusInstance::new("t");
        let a = bus
            .create_node(
                "A",
                NodeParams { payload_size: 4, flags: NodeFlags::CACHED, ..Default::default() },
            )
            .unwrap();
        bus.create_node("B", NodeParams::default()).unwrap();
        bus.publish(a.my_id(), &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let mut out = [0u8; 4];
        let outcome = bus.pull(a.my_id(), NodeRef::Name("A"), &mut out).unwrap();
        assert_eq!(outcome, PullOutcome::CachePulled);
        assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);

        let mut short = [0u8; 3];
        let err = bus.pull(a.my_id(), NodeRef::Name("A"), &mut short).unwrap_err();
        assert!(matches!(err, BusError::SizeMismatch));
    }

    #[test]
    fn publish_signal_updates_cache_but_dispatches_no_payload() {
        let bus = BusInstance::new("t");
        let a = bus
            .create_node(
                "A",
                NodeParams { payload_size: 4, flags: NodeFlags::CACHED, ..Default::default() },
            )
            .unwrap();
        let (cb, log) = recording_callback();
        let b = bus
            .create_node(
                "B",
                NodeParams {
                    event_mask: EventMask::PUBLISH_SIGNAL,
                    callback: Some(cb),
                    ..Default::default()
                },
            )
            .unwrap();
        bus.subscribe(b.my_id(), "A").unwrap();

        bus.publish_signal(a.my_id(), &[1, 2, 3, 4]).unwrap();
        let calls = log.lock().calls.clone();
        assert_eq!(calls, vec![(EventKind::PublishSignal, a.my_id(), b.my_id(), Vec::new())]);

        let mut out = [0u8; 4];
        let outcome = bus.pull(a.my_id(), NodeRef::Name("A"), &mut out).unwrap();
        assert_eq!(outcome, PullOutcome::CachePulled);
        assert_eq!(out, [1, 2, 3, 4]);

        let err = bus.publish_signal(a.my_id(), &[0u8; 3]).unwrap_err();
        assert!(matches!(err, BusError::SizeMismatch));
    }

    #[test]
    fn s3_pending_subscribe_becomes_live() {
        let bus = BusInstance::new("t");
        let (cb, log) = recording_callback();
        let b = bus
            .create_node("B", NodeParams { event_mask: EventMask::PUBLISH, callback: Some(cb), ..Default::default() })
            .unwrap();
        assert_eq!(bus.subscribe(b.my_id(), "later").unwrap(), SubscribeOutcome::Pending);

        let later = bus
            .create_node("later", NodeParams { payload_size: 1, ..Default::default() })
            .unwrap();
        assert_eq!(bus.sub_count(later.my_id()), 1);

        bus.publish(later.my_id(), &[7]).unwrap();
        assert_eq!(log.lock().calls.len(), 1);
    }

    #[test]
    fn s4_latched_delivers_on_subscribe() {
        let bus = BusInstance::new("t");
        let a = bus
            .create_node(
                "A",
                NodeParams {
                    payload_size: 4,
                    flags: NodeFlags::CACHED | NodeFlags::LATCHED,
                    ..Default::default()
                },
            )
            .unwrap();
        bus.publish(a.my_id(), &[0x11, 0x22, 0x33, 0x44]).unwrap();

        let (cb, log) = recording_callback();
        let b = bus
            .create_node(
                "B",
                NodeParams {
                    event_mask: EventMask::LATCHED | EventMask::PUBLISH,
                    callback: Some(cb),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(bus.subscribe(b.my_id(), "A").unwrap(), SubscribeOutcome::Subscribed);
        let calls = log.lock().calls.clone();
        assert_eq!(calls, vec![(EventKind::Latched, a.my_id(), b.my_id(), vec![0x11, 0x22, 0x33, 0x44])]);
    }

    #[test]
    fn s5_notify_size_check() {
        let bus = BusInstance::new("t");
        let (cb, log) = recording_callback();
        let t = bus
            .create_node(
                "T",
                NodeParams {
                    notify_size: 8,
                    flags: NodeFlags::NOTIFY_SIZE_CHECK,
                    event_mask: EventMask::NOTIFY,
                    callback: Some(cb),
                    ..Default::default()
                },
            )
            .unwrap();
        let s = bus.create_node("S", NodeParams::default()).unwrap();

        let err = bus.notify(s.my_id(), NodeRef::Name("T"), &[0u8; 4]).unwrap_err();
        assert!(matches!(err, BusError::SizeMismatch));
        assert!(log.lock().calls.is_empty());

        bus.notify(s.my_id(), NodeRef::Name("T"), &[0u8; 8]).unwrap();
        assert_eq!(log.lock().calls.len(), 1);
        let _ = t.my_id();
    }

    #[test]
    fn s6_removal_disconnects() {
        let bus = BusInstance::new("t");
        let a = bus.create_node("A", NodeParams { payload_size: 1, ..Default::default() }).unwrap();
        let mut logs = Vec::new();
        let mut ids = Vec::new();
        for name in ["B", "C", "D"] {
            let (cb, log) = recording_callback();
            let node = bus
                .create_node(name, NodeParams { event_mask: EventMask::PUBLISH, callback: Some(cb), ..Default::default() })
                .unwrap();
            bus.subscribe(node.my_id(), "A").unwrap();
            ids.push(node.my_id());
            logs.push(log);
        }
        bus.remove_node(NodeRef::Id(ids[0])).unwrap();
        assert_eq!(bus.sub_count(a.my_id()), 2);
        assert_eq!(bus.pub_count(ids[0]), 0);

        bus.publish(a.my_id(), &[9]).unwrap();
        assert!(logs[0].lock().calls.is_empty());
        assert_eq!(logs[1].lock().calls.len(), 1);
        assert_eq!(logs[2].lock().calls.len(), 1);
    }

    #[test]
    fn self_subscribe_rejected() {
        let bus = BusInstance::new("t");
        let a = bus
            .create_node("A", NodeParams { event_mask: EventMask::PUBLISH, ..Default::default() })
            .unwrap();
        let err = bus.subscribe(a.my_id(), "A").unwrap_err();
        assert!(matches!(err, BusError::Invalid));
    }

    #[test]
    fn duplicate_subscribe_rejected() {
        let bus = BusInstance::new("t");
        let a = bus.create_node("A", NodeParams::default()).unwrap();
        let b = bus
            .create_node("B", NodeParams { event_mask: EventMask::PUBLISH, ..Default::default() })
            .unwrap();
        bus.subscribe(b.my_id(), "A").unwrap();
        let err = bus.subscribe(b.my_id(), "A").unwrap_err();
        assert!(matches!(err, BusError::Exist));
    }

    #[test]
    fn dummy_node_present_on_init() {
        let bus = BusInstance::new("t");
        assert_eq!(bus.node_count(), 1);
        let (_, dummy) = bus.lookup(NodeRef::Id(bus.dummy_id())).unwrap();
        assert_eq!(dummy.name(), DUMMY_NODE_NAME);
    }
}
