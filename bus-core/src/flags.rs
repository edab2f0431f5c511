//! Node configuration flags and event masks.

use bitflags::bitflags;

bitflags! {
    /// Node configuration flags, drawn from {CACHED, NOTIFY_SIZE_CHECK, LATCHED}.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Node keeps a latched copy of its last Publish payload.
        const CACHED = 1 << 0;
        /// Inbound Notify payloads must match the node's declared `notify_size`.
        const NOTIFY_SIZE_CHECK = 1 << 1;
        /// Fresh subscribers receive a synthetic LATCHED event from the cache.
        /// Requires `CACHED`.
        const LATCHED = 1 << 2;
    }
}

bitflags! {
    /// Subset of event kinds a node's callback is willing to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EventMask: u8 {
        const PUBLISH = 1 << 0;
        const PULL = 1 << 1;
        const NOTIFY = 1 << 2;
        const PUBLISH_SIGNAL = 1 << 3;
        const LATCHED = 1 << 4;
    }
}
