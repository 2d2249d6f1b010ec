//! Shared fixtures for app integration tests.

use std::sync::Arc;

use profile_lock_app::{AppConfig, ControlHub, RenderingContext};
use profile_lock_core::LockRequest;
use profile_lock_overlay::SyntheticSurface;
use profile_lock_store::MemoryStore;

/// Hub over an empty in-memory store.
pub fn fresh_hub() -> (Arc<ControlHub>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hub = ControlHub::new(store.clone(), &AppConfig::default())
        .expect("hub should start over an empty store");
    (hub, store)
}

/// Hub configured with `password` and locked.
#[allow(dead_code)]
pub fn locked_hub(password: &str) -> (Arc<ControlHub>, Arc<MemoryStore>) {
    let (hub, store) = fresh_hub();
    hub.dispatch(&LockRequest::SetPassword {
        password: password.to_string(),
        auto_lock_enabled: None,
    })
    .expect("setup should be delivered");
    hub.dispatch(&LockRequest::Lock)
        .expect("lock should be delivered");
    (hub, store)
}

/// Attaches and activates `count` synthetic rendering contexts.
#[allow(dead_code)]
pub fn open_contexts(
    hub: &Arc<ControlHub>,
    count: usize,
) -> Vec<RenderingContext<SyntheticSurface>> {
    (0..count)
        .map(|_| {
            let mut context = hub
                .attach(SyntheticSurface::new())
                .expect("validated timings attach");
            context.activate();
            context
        })
        .collect()
}
