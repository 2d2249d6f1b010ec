#![warn(missing_docs)]
//! # profile-lock-store
//!
//! ## Purpose
//! Adapts an external key-value store into the canonical lock record used by
//! the authorization service.
//!
//! ## Responsibilities
//! - Define a backend-agnostic `get(keys)` / `set(patch)` / `remove(keys)`
//!   store contract.
//! - Provide an in-memory backend for tests and a JSON file backend that
//!   survives control process restarts.
//! - Resolve stored keys into a [`LockRecord`] with defaults applied.
//!
//! ## Data flow
//! Authorization service -> [`CredentialStore`] -> [`KeyValueStore`] backend.
//!
//! ## Ownership and lifetimes
//! Backends own their state behind interior mutability so one instance can be
//! shared through `Arc<dyn KeyValueStore>`.
//!
//! ## Error model
//! I/O, codec, and lock-poisoning failures are reported as [`StoreError`].
//! No validation happens here; this is pure storage.
//!
//! ## Security and privacy notes
//! Only the password digest is stored, never the password itself.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use profile_lock_core::{LockRecord, LockRecordPatch, StoreKey};
use thiserror::Error;
use tracing::debug;

/// Key-value contract implemented by concrete storage providers.
pub trait KeyValueStore: Send + Sync {
    /// Reads the requested keys; absent keys stay `None`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be read.
    fn get(&self, keys: &[StoreKey]) -> Result<LockRecordPatch, StoreError>;

    /// Merges every present field of `values` into the store.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be written.
    fn set(&self, values: &LockRecordPatch) -> Result<(), StoreError>;

    /// Deletes the requested keys.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot be written.
    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError>;
}

/// Volatile backend used by tests and by hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<LockRecordPatch>,
}

impl MemoryStore {
    /// Creates an empty store (fresh install).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `values`.
    pub fn with_values(values: LockRecordPatch) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    /// Returns a copy of every stored key.
    ///
    /// # Errors
    /// Returns [`StoreError::Poisoned`] when the inner lock is poisoned.
    pub fn snapshot(&self) -> Result<LockRecordPatch, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.clone())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, keys: &[StoreKey]) -> Result<LockRecordPatch, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.project(keys))
    }

    fn set(&self, patch: &LockRecordPatch) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.merge(patch);
        Ok(())
    }

    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.clear(keys);
        Ok(())
    }
}

/// JSON file backend.
///
/// Every write replaces the file through a sibling temp file and a rename, so
/// a crash mid-write leaves the previous record intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a backend rooted at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<LockRecordPatch, StoreError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(LockRecordPatch::default()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(StoreError::Codec),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(LockRecordPatch::default()),
            Err(error) => Err(StoreError::Io(error)),
        }
    }

    fn write_all(&self, values: &LockRecordPatch) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_vec_pretty(values).map_err(StoreError::Codec)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), "lock record persisted");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[StoreKey]) -> Result<LockRecordPatch, StoreError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.project(keys))
    }

    fn set(&self, patch: &LockRecordPatch) -> Result<(), StoreError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut values = self.read_all()?;
        values.merge(patch);
        self.write_all(&values)
    }

    fn remove(&self, keys: &[StoreKey]) -> Result<(), StoreError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut values = self.read_all()?;
        values.clear(keys);
        self.write_all(&values)
    }
}

/// Adapter owning the canonical lock record keys.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Wraps a key-value backend.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Loads the full record with defaults applied.
    ///
    /// # Errors
    /// Propagates backend read failures.
    pub fn load(&self) -> Result<LockRecord, StoreError> {
        let stored = self.backend.get(&StoreKey::ALL)?;
        Ok(LockRecord::from_patch(&stored))
    }

    /// Writes the present fields of `patch`.
    ///
    /// # Errors
    /// Propagates backend write failures.
    pub fn write(&self, patch: &LockRecordPatch) -> Result<(), StoreError> {
        self.backend.set(patch)
    }

    /// Removes every lock record key, returning to the unconfigured state.
    ///
    /// # Errors
    /// Propagates backend write failures.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&StoreKey::ALL)
    }
}

/// Storage layer error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store i/o failure: {0}")]
    Io(#[from] std::io::Error),
    /// Stored JSON could not be encoded or decoded.
    #[error("store codec failure: {0}")]
    Codec(serde_json::Error),
    /// A previous holder of the store lock panicked.
    #[error("store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    //! Unit tests for the in-memory backend.

    use super::*;

    #[test]
    fn memory_store_get_returns_only_requested_keys() {
        let store = MemoryStore::with_values(LockRecordPatch {
            password_hash: Some("digest".to_string()),
            is_locked: Some(false),
            auto_lock_enabled: Some(true),
        });

        let partial = store
            .get(&[StoreKey::PasswordHash])
            .expect("read should work");
        assert_eq!(partial.password_hash.as_deref(), Some("digest"));
        assert_eq!(partial.is_locked, None);
        assert_eq!(partial.auto_lock_enabled, None);
    }

    #[test]
    fn credential_store_clear_returns_to_defaults() {
        let backend = Arc::new(MemoryStore::with_values(LockRecordPatch {
            password_hash: Some("digest".to_string()),
            is_locked: Some(false),
            auto_lock_enabled: Some(false),
        }));
        let store = CredentialStore::new(backend.clone());
        store.clear().expect("clear should work");

        let record = store.load().expect("load should work");
        assert!(!record.has_password());
        assert!(record.is_locked);
        assert!(record.auto_lock_enabled);
        assert!(backend.snapshot().expect("snapshot").is_empty());
    }
}
