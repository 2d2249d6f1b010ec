#![warn(missing_docs)]
//! # profile-lock-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `profile-lock` workspace.
//!
//! ## Responsibilities
//! - Represent the persisted lock record and its partial (per-key) form.
//! - Resolve stored values into the effective lock state.
//! - Define the request/response and broadcast wire protocol exchanged between
//!   the control process and rendering contexts.
//! - Encode/decode protocol messages as JSON.
//!
//! ## Data flow
//! The store returns a [`LockRecordPatch`] which is resolved into a
//! [`LockRecord`]. The authorization service answers [`LockRequest`]s with
//! [`LockResponse`]s and fans out [`Broadcast`] notices; overlay controllers
//! act only on [`LockSnapshot::effective_locked`].
//!
//! ## Ownership and lifetimes
//! Messages own their strings so they can cross the transport boundary without
//! borrowing from request buffers.
//!
//! ## Error model
//! Only codec failures are possible here; they return [`CoreError`].
//!
//! ## Security and privacy notes
//! `Debug` output of [`LockRequest`] redacts every password field.
//!
//! ## Example
//! ```rust
//! use profile_lock_core::{LockRecord, LockRecordPatch};
//!
//! let record = LockRecord::from_patch(&LockRecordPatch::default());
//! assert!(record.is_locked);
//! assert!(!record.effective_locked());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for a wrong password on unlock and remove.
pub const MSG_INCORRECT_PASSWORD: &str = "Incorrect password";
/// Message returned for a wrong current password on change.
pub const MSG_INCORRECT_CURRENT_PASSWORD: &str = "Current password is incorrect";
/// Message returned when setup is attempted while a password exists.
pub const MSG_PASSWORD_ALREADY_SET: &str = "A password is already set";
/// Message returned when an empty password reaches the service.
pub const MSG_EMPTY_PASSWORD: &str = "Password must not be empty";
/// Message returned when persistence fails.
pub const MSG_STORAGE_UNAVAILABLE: &str = "Storage unavailable";

/// Persisted record keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Hex digest of the configured password.
    PasswordHash,
    /// Canonical lock flag.
    IsLocked,
    /// Whether idle/lock-screen signals lock automatically.
    AutoLockEnabled,
}

impl StoreKey {
    /// Every key of the lock record.
    pub const ALL: [StoreKey; 3] = [
        StoreKey::PasswordHash,
        StoreKey::IsLocked,
        StoreKey::AutoLockEnabled,
    ];

    /// Returns the persisted key name.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::PasswordHash => "passwordHash",
            StoreKey::IsLocked => "isLocked",
            StoreKey::AutoLockEnabled => "autoLockEnabled",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial lock record as exchanged with the key-value store.
///
/// `None` means "key absent" on reads and "leave untouched" on writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecordPatch {
    /// Hex digest of the configured password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Canonical lock flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    /// Auto-lock preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_lock_enabled: Option<bool>,
}

impl LockRecordPatch {
    /// Overwrites fields present in `other`, leaving absent ones untouched.
    pub fn merge(&mut self, other: &LockRecordPatch) {
        if let Some(hash) = &other.password_hash {
            self.password_hash = Some(hash.clone());
        }
        if let Some(locked) = other.is_locked {
            self.is_locked = Some(locked);
        }
        if let Some(auto_lock) = other.auto_lock_enabled {
            self.auto_lock_enabled = Some(auto_lock);
        }
    }

    /// Returns a copy holding only the requested keys.
    pub fn project(&self, keys: &[StoreKey]) -> LockRecordPatch {
        let mut projected = LockRecordPatch::default();
        for key in keys {
            match key {
                StoreKey::PasswordHash => projected.password_hash = self.password_hash.clone(),
                StoreKey::IsLocked => projected.is_locked = self.is_locked,
                StoreKey::AutoLockEnabled => projected.auto_lock_enabled = self.auto_lock_enabled,
            }
        }
        projected
    }

    /// Clears the requested keys.
    pub fn clear(&mut self, keys: &[StoreKey]) {
        for key in keys {
            match key {
                StoreKey::PasswordHash => self.password_hash = None,
                StoreKey::IsLocked => self.is_locked = None,
                StoreKey::AutoLockEnabled => self.auto_lock_enabled = None,
            }
        }
    }

    /// Returns `true` when no key is present.
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.is_locked.is_none() && self.auto_lock_enabled.is_none()
    }
}

/// Fully resolved lock record with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Hex digest of the configured password, absent when unconfigured.
    pub password_hash: Option<String>,
    /// Canonical lock flag, meaningful only when a password exists.
    pub is_locked: bool,
    /// Whether idle/lock-screen signals lock automatically.
    pub auto_lock_enabled: bool,
}

impl LockRecord {
    /// Resolves a stored patch. Absent `isLocked` and `autoLockEnabled` read
    /// as `true`.
    pub fn from_patch(patch: &LockRecordPatch) -> Self {
        Self {
            password_hash: patch.password_hash.clone(),
            is_locked: patch.is_locked.unwrap_or(true),
            auto_lock_enabled: patch.auto_lock_enabled.unwrap_or(true),
        }
    }

    /// Returns `true` when a password is configured.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Effective lock state: `isLocked AND hasPassword`.
    pub fn effective_locked(&self) -> bool {
        self.is_locked && self.has_password()
    }

    /// Projects the record into the `getLockState` response shape.
    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            is_locked: self.is_locked,
            has_password: self.has_password(),
        }
    }

    /// Converts the record into a full write patch.
    pub fn to_patch(&self) -> LockRecordPatch {
        LockRecordPatch {
            password_hash: self.password_hash.clone(),
            is_locked: Some(self.is_locked),
            auto_lock_enabled: Some(self.auto_lock_enabled),
        }
    }
}

/// Lock state as reported to rendering contexts and the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSnapshot {
    /// Stored lock flag.
    pub is_locked: bool,
    /// Whether a password is configured.
    pub has_password: bool,
}

impl LockSnapshot {
    /// Effective lock state: `isLocked AND hasPassword`.
    pub fn effective_locked(&self) -> bool {
        self.is_locked && self.has_password
    }
}

/// Requests accepted by the authorization service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LockRequest {
    /// Query `{isLocked, hasPassword}`.
    GetLockState,
    /// Attempt to unlock with a password.
    Unlock {
        /// Candidate password.
        password: String,
    },
    /// Lock immediately.
    Lock,
    /// Configure the first password.
    SetPassword {
        /// New password.
        password: String,
        /// Auto-lock preference, default `true`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto_lock_enabled: Option<bool>,
    },
    /// Replace the password after re-validating the current one.
    ChangePassword {
        /// Current password.
        current_password: String,
        /// Replacement password.
        new_password: String,
    },
    /// Remove the password after re-validating it.
    RemovePassword {
        /// Current password.
        password: String,
    },
}

impl LockRequest {
    /// Returns the wire action name.
    pub fn action(&self) -> &'static str {
        match self {
            LockRequest::GetLockState => "getLockState",
            LockRequest::Unlock { .. } => "unlock",
            LockRequest::Lock => "lock",
            LockRequest::SetPassword { .. } => "setPassword",
            LockRequest::ChangePassword { .. } => "changePassword",
            LockRequest::RemovePassword { .. } => "removePassword",
        }
    }

    /// Serializes the request to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes a request from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

impl fmt::Debug for LockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        match self {
            LockRequest::GetLockState => f.write_str("GetLockState"),
            LockRequest::Lock => f.write_str("Lock"),
            LockRequest::Unlock { .. } => f
                .debug_struct("Unlock")
                .field("password", &REDACTED)
                .finish(),
            LockRequest::SetPassword {
                auto_lock_enabled, ..
            } => f
                .debug_struct("SetPassword")
                .field("password", &REDACTED)
                .field("auto_lock_enabled", auto_lock_enabled)
                .finish(),
            LockRequest::ChangePassword { .. } => f
                .debug_struct("ChangePassword")
                .field("current_password", &REDACTED)
                .field("new_password", &REDACTED)
                .finish(),
            LockRequest::RemovePassword { .. } => f
                .debug_struct("RemovePassword")
                .field("password", &REDACTED)
                .finish(),
        }
    }
}

/// Outcome of a state-mutating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the request succeeded.
    pub success: bool,
    /// User-facing failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed outcome with a user-facing message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Responses produced by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LockResponse {
    /// Answer to [`LockRequest::GetLockState`].
    State(LockSnapshot),
    /// Answer to every other request.
    Outcome(ActionOutcome),
}

impl LockResponse {
    /// Returns `true` for an action outcome with `success: false`.
    pub fn is_rejection(&self) -> bool {
        matches!(self, LockResponse::Outcome(outcome) if !outcome.success)
    }

    /// Serializes the response to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes a response from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

/// Fire-and-forget notices pushed to every rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Broadcast {
    /// Effective lock state may have changed; receivers re-query.
    LockStateChanged,
}

/// System idle/lock-screen state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    /// User is active.
    Active,
    /// No input for the detection interval.
    Idle,
    /// The OS lock screen is showing.
    Locked,
}

impl IdleState {
    /// Returns `true` for the states that may trigger auto-lock.
    pub fn triggers_auto_lock(self) -> bool {
        matches!(self, IdleState::Idle | IdleState::Locked)
    }
}

impl std::str::FromStr for IdleState {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(IdleState::Active),
            "idle" => Ok(IdleState::Idle),
            "locked" => Ok(IdleState::Locked),
            other => Err(CoreError::UnknownIdleState(other.to_string())),
        }
    }
}

/// Lifecycle inputs processed by the authorization service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The control process started.
    Startup,
    /// The component was installed or updated.
    Installed,
    /// The host idle source changed state.
    IdleStateChanged(IdleState),
}

/// Error type for core codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON encoding/decoding error.
    #[error("protocol codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Idle state string is not one of `active`, `idle`, `locked`.
    #[error("unknown idle state: {0}")]
    UnknownIdleState(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for record resolution and request redaction.

    use super::*;

    #[test]
    fn effective_lock_requires_password() {
        let record = LockRecord::from_patch(&LockRecordPatch {
            password_hash: None,
            is_locked: Some(true),
            auto_lock_enabled: None,
        });
        assert!(record.is_locked);
        assert!(record.auto_lock_enabled);
        assert!(!record.effective_locked());
        assert!(!record.snapshot().effective_locked());
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let request = LockRequest::ChangePassword {
            current_password: "old-secret".to_string(),
            new_password: "new-secret".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("old-secret"));
        assert!(!rendered.contains("new-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn patch_merge_keeps_absent_keys() {
        let mut stored = LockRecordPatch {
            password_hash: Some("abc".to_string()),
            is_locked: Some(true),
            auto_lock_enabled: Some(false),
        };
        stored.merge(&LockRecordPatch {
            is_locked: Some(false),
            ..LockRecordPatch::default()
        });
        assert_eq!(stored.password_hash.as_deref(), Some("abc"));
        assert_eq!(stored.is_locked, Some(false));
        assert_eq!(stored.auto_lock_enabled, Some(false));
    }
}
