//! Event descriptor carried to every node callback.

use std::any::Any;
use std::sync::Arc;

use crate::node::NodeId;

/// The five event kinds the delivery engine dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Publish,
    PublishSignal,
    Pull,
    Notify,
    Latched,
}

/// Opaque per-node user data, analogous to the `void *user_data` carried by
/// the original C node and handed back to the callback untouched.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Payload carried by an event. `Pull` hands the callback a buffer to fill;
/// every other kind hands it a read-only view (or nothing, for
/// Publish-Signal).
pub enum EventData<'a> {
    None,
    Read(&'a [u8]),
    Write(&'a mut [u8]),
}

impl<'a> EventData<'a> {
    pub fn len(&self) -> usize {
        match self {
            EventData::None => 0,
            EventData::Read(b) => b.len(),
            EventData::Write(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The event descriptor passed to a node's callback.
pub struct EventParam<'a> {
    pub event: EventKind,
    pub sender: NodeId,
    pub receiver: NodeId,
    pub data: EventData<'a>,
    pub user_data: Option<&'a UserData>,
}

/// A node's receiver callback. Invoked synchronously on the caller's
/// thread; must not assume any bus lock is held and may freely re-enter
/// the bus.
pub type Callback = Arc<dyn Fn(EventParam<'_>) -> i32 + Send + Sync + 'static>;
