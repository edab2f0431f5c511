//! The two external surfaces over [`bus_core`]: a procedural surface for
//! callers who own their own node storage, and an object surface for
//! callers who want the library to own nodes.

pub mod object;
pub mod procedural;

pub use bus_core::{
    error_string, BusError, BusInstance, Callback, EventData, EventKind, EventMask, EventParam,
    ErrorCode, Node, NodeFlags, NodeId, NodeParams, NodeRef, UserData, INVALID_ID,
};
pub use object::{default_instance, delete_instance, get_instance, BusInstanceHandle, NodeHandle};
pub use procedural::{
    deinit, deinit_node, error_string as proc_error_string, init, init_node, node_count, notify,
    publish, publish_signal, pull, pull_anon, push_back_node, remove_node, search_by_name,
    sub_count, subscribe, unsubscribe, ProcNode,
};
