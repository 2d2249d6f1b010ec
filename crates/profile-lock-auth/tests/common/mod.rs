//! Shared fixtures for authorization service integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use profile_lock_auth::{AuthService, Broadcaster};
use profile_lock_core::{Broadcast, LockRecordPatch, StoreKey};
use profile_lock_store::{CredentialStore, KeyValueStore, MemoryStore, StoreError};

/// Counts broadcasts instead of delivering them.
#[derive(Debug, Default)]
pub struct CountingBroadcaster {
    sent: AtomicUsize,
}

impl CountingBroadcaster {
    /// Number of broadcasts issued so far.
    #[allow(dead_code)]
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Broadcaster for CountingBroadcaster {
    fn broadcast(&self, _notice: Broadcast) -> usize {
        self.sent.fetch_add(1, Ordering::SeqCst);
        1
    }
}

/// Store whose writes always fail while reads succeed.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

impl ReadOnlyStore {
    /// Creates a read-only store holding `values`.
    #[allow(dead_code)]
    pub fn with_values(values: LockRecordPatch) -> Self {
        Self {
            inner: MemoryStore::with_values(values),
        }
    }
}

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, keys: &[StoreKey]) -> Result<LockRecordPatch, StoreError> {
        self.inner.get(keys)
    }

    fn set(&self, _values: &LockRecordPatch) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("read-only store")))
    }

    fn remove(&self, _keys: &[StoreKey]) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("read-only store")))
    }
}

/// Fresh-install service plus handles to its store and broadcaster.
#[allow(dead_code)]
pub fn fresh_service() -> (AuthService, Arc<MemoryStore>, Arc<CountingBroadcaster>) {
    let store = Arc::new(MemoryStore::new());
    let broadcaster = Arc::new(CountingBroadcaster::default());
    let service = AuthService::new(CredentialStore::new(store.clone()), broadcaster.clone())
        .expect("service should load an empty store");
    (service, store, broadcaster)
}

/// Service configured with `password` and then locked.
#[allow(dead_code)]
pub fn locked_service(password: &str) -> (AuthService, Arc<MemoryStore>, Arc<CountingBroadcaster>) {
    let (mut service, store, broadcaster) = fresh_service();
    service
        .set_password(password, None)
        .expect("setup should succeed");
    service.lock().expect("lock should succeed");
    (service, store, broadcaster)
}
