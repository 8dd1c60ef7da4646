use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use zkmcp_test_utils::sample_metadata;

use crate::bridge::{Bridge, BridgeOptions, MetadataSources};
use crate::registry::InMemoryToolRegistry;

/// Serialize tests that mutate process-global state (env vars, cwd, etc).
pub(crate) fn env_guard() -> MutexGuard<'static, ()> {
    static TEST_SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    TEST_SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// Metadata sources backed by the sample catalog.
pub(crate) fn sample_sources() -> MetadataSources {
    let sample = sample_metadata();
    MetadataSources {
        store: Some(sample.store),
        types: Some(sample.types),
        entities: sample.entities,
    }
}

/// A bridge over the sample catalog publishing into an in-memory registry.
pub(crate) fn sample_bridge() -> (Bridge, Arc<InMemoryToolRegistry>) {
    let registry = Arc::new(InMemoryToolRegistry::new());
    let bridge = Bridge::new(registry.clone(), sample_sources(), BridgeOptions::default());
    (bridge, registry)
}
