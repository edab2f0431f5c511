//! Process-wide instance directory: a name → instance map, lazily
//! populated, serialised by a single mutex.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::DEFAULT_INSTANCE_NAME;
use crate::instance::BusInstance;

fn directory() -> &'static Mutex<HashMap<String, Arc<BusInstance>>> {
    static DIRECTORY: OnceLock<Mutex<HashMap<String, Arc<BusInstance>>>> = OnceLock::new();
    DIRECTORY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Return the instance named `name`, creating it (with its dummy node
/// already registered) if this is the first reference.
pub fn get_or_create(name: &str) -> Arc<BusInstance> {
    let mut map = directory().lock();
    if let Some(existing) = map.get(name) {
        return existing.clone();
    }
    let instance = Arc::new(BusInstance::new(name));
    map.insert(name.to_string(), instance.clone());
    tracing::debug!(instance = name, "bus instance created");
    instance
}

/// The instance named `"default"`.
pub fn default_instance() -> Arc<BusInstance> {
    get_or_create(DEFAULT_INSTANCE_NAME)
}

/// Drop an instance from the directory, deinitialising every node still
/// registered on it. Handles already held by callers continue to exist
/// (the instance object itself is only truly freed once the last `Arc`
/// drops), but every node they reference now reports `INVALID_ID`, exactly
/// as if each had been removed individually.
pub fn remove(name: &str) -> bool {
    let removed = directory().lock().remove(name);
    match removed {
        Some(instance) => {
            instance.deinit_all_nodes();
            tracing::debug!(instance = name, "bus instance removed");
            true
        }
        None => false,
    }
}

/// Snapshot of currently live instance names, for diagnostics.
pub fn instance_names() -> Vec<String> {
    directory().lock().keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_by_name() {
        let a = get_or_create("directory-test-a");
        let b = get_or_create("directory-test-a");
        assert!(Arc::ptr_eq(&a, &b));
        remove("directory-test-a");
    }

    #[test]
    fn default_instance_has_name_default() {
        let d = default_instance();
        assert_eq!(d.name(), DEFAULT_INSTANCE_NAME);
    }

    #[test]
    fn remove_deinitialises_nodes_even_for_handles_held_past_removal() {
        use crate::node::INVALID_ID;
        use crate::registry::NodeRef;

        let inst = get_or_create("directory-test-b");
        let dummy_id = inst.dummy_id();
        let (_, dummy) = inst.lookup(NodeRef::Id(dummy_id)).unwrap();

        assert!(remove("directory-test-b"));

        assert_eq!(inst.node_count(), 0);
        assert_eq!(dummy.my_id(), INVALID_ID);
        assert!(!remove("directory-test-b"));
    }
}
