#![warn(missing_docs)]
//! # profile-lock-auth
//!
//! ## Purpose
//! Implements the authorization service: the lock state machine, password
//! validation, and lifecycle-driven locking for `profile-lock`.
//!
//! ## Responsibilities
//! - Digest passwords with the application salt.
//! - Model legal transitions between `Unconfigured`, `Locked`, and `Unlocked`.
//! - Answer protocol requests from rendering contexts and the settings surface.
//! - Apply startup, install, and idle signals.
//! - Notify every rendering context through an injectable [`Broadcaster`].
//!
//! ## Data flow
//! Transport delivers a [`LockRequest`] -> [`AuthService::handle`] reloads the
//! record from [`CredentialStore`] -> validates and persists the next record ->
//! updates its mirror -> broadcasts -> returns a [`LockResponse`].
//!
//! ## Ownership and lifetimes
//! The service owns its store adapter and mirror; callers serialize access
//! (one request runs to completion before the next starts).
//!
//! ## Error model
//! Wrong passwords, setup conflicts, empty passwords, and storage failures are
//! surfaced as [`AuthError`]; none of them is fatal to the process. Failed
//! attempts never touch the stored record.
//!
//! ## Security and privacy notes
//! The digest uses a fixed application salt and a single SHA-256 round. It is
//! a deterrent against casual snooping, not a credential store; it is kept for
//! compatibility with previously stored digests. Passwords and digests are
//! never logged.
//!
//! ## Example
//! ```rust
//! use profile_lock_auth::{LockState, LockStateMachine};
//!
//! let machine = LockStateMachine::new();
//! assert_eq!(machine.state(), LockState::Unconfigured);
//! ```

use std::sync::Arc;

use profile_lock_core::{
    ActionOutcome, Broadcast, IdleState, LifecycleEvent, LockRecord, LockRecordPatch, LockRequest,
    LockResponse, LockSnapshot, MSG_EMPTY_PASSWORD, MSG_INCORRECT_CURRENT_PASSWORD,
    MSG_INCORRECT_PASSWORD, MSG_PASSWORD_ALREADY_SET, MSG_STORAGE_UNAVAILABLE,
};
use profile_lock_store::{CredentialStore, StoreError};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fixed application salt appended to every password before hashing.
pub const PASSWORD_SALT: &str = "profile-lock-salt-v1";

/// Default host idle detection interval in seconds.
pub const DEFAULT_IDLE_DETECTION_SECS: u64 = 300;

/// Hashes `password` with the application salt into lowercase hex.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(PASSWORD_SALT.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns `true` when `password` digests to `stored_hash`.
///
/// An absent digest never matches.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> bool {
    stored_hash.is_some_and(|stored| hash_password(password) == stored)
}

/// Lock state derived from the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No password configured; effective state is always unlocked.
    Unconfigured,
    /// Password configured and content blocked.
    Locked,
    /// Password configured and content accessible.
    Unlocked,
}

impl LockState {
    /// Derives the state from a resolved record.
    pub fn from_record(record: &LockRecord) -> Self {
        match (record.has_password(), record.is_locked) {
            (false, _) => LockState::Unconfigured,
            (true, true) => LockState::Locked,
            (true, false) => LockState::Unlocked,
        }
    }

    /// Returns `true` for [`LockState::Locked`].
    pub fn is_effectively_locked(self) -> bool {
        self == LockState::Locked
    }
}

/// Lock state machine with explicit legal transitions.
#[derive(Debug, Clone)]
pub struct LockStateMachine {
    state: LockState,
}

impl LockStateMachine {
    /// Creates a new state machine in `Unconfigured` state.
    pub fn new() -> Self {
        Self {
            state: LockState::Unconfigured,
        }
    }

    /// Creates a machine positioned at the state stored in `record`.
    pub fn from_record(record: &LockRecord) -> Self {
        Self {
            state: LockState::from_record(record),
        }
    }

    /// Returns current state snapshot.
    pub fn state(&self) -> LockState {
        self.state
    }

    /// First password configured.
    ///
    /// # Errors
    /// Returns [`AuthError::AlreadyConfigured`] unless the machine is
    /// `Unconfigured`.
    pub fn on_password_set(&mut self) -> Result<LockState, AuthError> {
        if self.state != LockState::Unconfigured {
            return Err(AuthError::AlreadyConfigured);
        }
        self.state = LockState::Unlocked;
        Ok(self.state)
    }

    /// Password validated by an unlock request.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredential`] while `Unconfigured`, since no
    /// password can have matched.
    pub fn on_unlock(&mut self) -> Result<LockState, AuthError> {
        if self.state == LockState::Unconfigured {
            return Err(AuthError::InvalidCredential(MSG_INCORRECT_PASSWORD));
        }
        self.state = LockState::Unlocked;
        Ok(self.state)
    }

    /// Explicit lock, startup, install, or idle signal. Without a password the
    /// machine stays `Unconfigured`.
    pub fn on_lock(&mut self) -> LockState {
        if self.state != LockState::Unconfigured {
            self.state = LockState::Locked;
        }
        self.state
    }

    /// Password removed after re-validation.
    pub fn on_password_removed(&mut self) -> LockState {
        self.state = LockState::Unconfigured;
        self.state
    }
}

impl Default for LockStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort fan-out of notices to every rendering context.
pub trait Broadcaster: Send + Sync {
    /// Delivers `notice` to every reachable context and returns how many were
    /// reached. Delivery failures are ignored.
    fn broadcast(&self, notice: Broadcast) -> usize;
}

/// Broadcaster for hosts without rendering contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentBroadcaster;

impl Broadcaster for SilentBroadcaster {
    fn broadcast(&self, _notice: Broadcast) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Notify {
    Always,
    OnEffectiveChange,
}

/// Authorization service owning the canonical lock record.
pub struct AuthService {
    store: CredentialStore,
    broadcaster: Arc<dyn Broadcaster>,
    machine: LockStateMachine,
    mirror: LockRecord,
    idle_detection_secs: u64,
}

impl AuthService {
    /// Loads the stored record and creates the service.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the record cannot be read.
    pub fn new(
        store: CredentialStore,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self, AuthError> {
        let mirror = store.load()?;
        Ok(Self {
            machine: LockStateMachine::from_record(&mirror),
            store,
            broadcaster,
            mirror,
            idle_detection_secs: DEFAULT_IDLE_DETECTION_SECS,
        })
    }

    /// Overrides the idle detection interval reported to the host.
    pub fn with_idle_detection_secs(mut self, seconds: u64) -> Self {
        self.idle_detection_secs = seconds.max(1);
        self
    }

    /// Interval the host should register with its idle source.
    pub fn idle_detection_secs(&self) -> u64 {
        self.idle_detection_secs
    }

    /// Current state as of the last processed request.
    pub fn state(&self) -> LockState {
        self.machine.state()
    }

    /// In-memory mirror of the persisted record.
    pub fn record(&self) -> &LockRecord {
        &self.mirror
    }

    /// Answers one protocol request.
    pub fn handle(&mut self, request: &LockRequest) -> LockResponse {
        debug!(action = request.action(), "handling lock request");
        match request {
            LockRequest::GetLockState => match self.get_lock_state() {
                Ok(snapshot) => LockResponse::State(snapshot),
                Err(error) => outcome(Err(error)),
            },
            LockRequest::Unlock { password } => outcome(self.unlock(password)),
            LockRequest::Lock => outcome(self.lock()),
            LockRequest::SetPassword {
                password,
                auto_lock_enabled,
            } => outcome(self.set_password(password, *auto_lock_enabled)),
            LockRequest::ChangePassword {
                current_password,
                new_password,
            } => outcome(self.change_password(current_password, new_password)),
            LockRequest::RemovePassword { password } => outcome(self.remove_password(password)),
        }
    }

    /// Returns `{isLocked, hasPassword}` as stored.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when the record cannot be read.
    pub fn get_lock_state(&mut self) -> Result<LockSnapshot, AuthError> {
        Ok(self.refresh()?.snapshot())
    }

    /// Unlocks when `password` matches the stored digest.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredential`] on mismatch; state is unchanged.
    pub fn unlock(&mut self, password: &str) -> Result<(), AuthError> {
        let current = self.refresh()?;
        if !verify_password(password, current.password_hash.as_deref()) {
            warn!(state = ?self.machine.state(), "unlock rejected: incorrect password");
            return Err(AuthError::InvalidCredential(MSG_INCORRECT_PASSWORD));
        }

        let mut machine = self.machine.clone();
        machine.on_unlock()?;
        let next = LockRecord {
            is_locked: false,
            ..current
        };
        self.commit(
            &LockRecordPatch {
                is_locked: Some(false),
                ..LockRecordPatch::default()
            },
            next,
            machine,
            Notify::Always,
        )
    }

    /// Locks immediately.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when persistence fails.
    pub fn lock(&mut self) -> Result<(), AuthError> {
        self.apply_lock(Notify::Always)
    }

    /// Configures the first password and leaves the profile unlocked.
    ///
    /// # Errors
    /// Returns [`AuthError::EmptyPassword`] for an empty password and
    /// [`AuthError::AlreadyConfigured`] when a password already exists.
    pub fn set_password(
        &mut self,
        password: &str,
        auto_lock_enabled: Option<bool>,
    ) -> Result<(), AuthError> {
        if password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }
        self.refresh()?;

        let mut machine = self.machine.clone();
        machine.on_password_set()?;
        let next = LockRecord {
            password_hash: Some(hash_password(password)),
            is_locked: false,
            auto_lock_enabled: auto_lock_enabled.unwrap_or(true),
        };
        let patch = next.to_patch();
        self.commit(&patch, next, machine, Notify::Always)
    }

    /// Replaces the password after re-validating `current`. Lock state is not
    /// changed.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredential`] when `current` is wrong and
    /// [`AuthError::EmptyPassword`] when `new_password` is empty.
    pub fn change_password(&mut self, current: &str, new_password: &str) -> Result<(), AuthError> {
        let stored = self.refresh()?;
        if !verify_password(current, stored.password_hash.as_deref()) {
            warn!("password change rejected: incorrect current password");
            return Err(AuthError::InvalidCredential(MSG_INCORRECT_CURRENT_PASSWORD));
        }
        if new_password.is_empty() {
            return Err(AuthError::EmptyPassword);
        }

        let digest = hash_password(new_password);
        let next = LockRecord {
            password_hash: Some(digest.clone()),
            ..stored
        };
        self.store.write(&LockRecordPatch {
            password_hash: Some(digest),
            ..LockRecordPatch::default()
        })?;
        self.mirror = next;
        info!("password changed");
        Ok(())
    }

    /// Removes the password after re-validating it, returning to
    /// `Unconfigured` with default flags.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredential`] when `password` is wrong.
    pub fn remove_password(&mut self, password: &str) -> Result<(), AuthError> {
        let stored = self.refresh()?;
        if !verify_password(password, stored.password_hash.as_deref()) {
            warn!("password removal rejected: incorrect password");
            return Err(AuthError::InvalidCredential(MSG_INCORRECT_PASSWORD));
        }

        let previous_effective = self.mirror.effective_locked();
        self.store.clear()?;
        self.mirror = LockRecord::from_patch(&LockRecordPatch::default());
        self.machine.on_password_removed();
        info!(state = ?self.machine.state(), "password removed");
        self.notify(previous_effective, Notify::Always);
        Ok(())
    }

    /// Applies a lifecycle signal.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when persistence fails.
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Result<(), AuthError> {
        match event {
            LifecycleEvent::Startup => self.on_startup(),
            LifecycleEvent::Installed => self.on_installed(),
            LifecycleEvent::IdleStateChanged(state) => self.on_idle_state_changed(state),
        }
    }

    /// Control process started: the stored flag is forced to locked.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when persistence fails.
    pub fn on_startup(&mut self) -> Result<(), AuthError> {
        info!("startup: locking profile");
        self.apply_lock(Notify::OnEffectiveChange)
    }

    /// Installed or updated: locks when a password exists, otherwise clears the
    /// flag so setup stays reachable.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when persistence fails.
    pub fn on_installed(&mut self) -> Result<(), AuthError> {
        let current = self.refresh()?;
        if current.has_password() {
            info!("install/update with password configured: locking profile");
            return self.apply_lock(Notify::OnEffectiveChange);
        }

        info!("install/update without password: leaving profile open for setup");
        let next = LockRecord {
            is_locked: false,
            ..current
        };
        let machine = self.machine.clone();
        self.commit(
            &LockRecordPatch {
                is_locked: Some(false),
                ..LockRecordPatch::default()
            },
            next,
            machine,
            Notify::OnEffectiveChange,
        )
    }

    /// Host idle source changed state. Locks only for `idle`/`locked` when
    /// auto-lock is enabled and a password exists.
    ///
    /// # Errors
    /// Returns [`AuthError::Storage`] when persistence fails.
    pub fn on_idle_state_changed(&mut self, state: IdleState) -> Result<(), AuthError> {
        let current = self.refresh()?;
        if !(state.triggers_auto_lock() && current.auto_lock_enabled && current.has_password()) {
            debug!(?state, "idle signal ignored");
            return Ok(());
        }

        info!(?state, "auto-lock triggered by idle signal");
        self.apply_lock(Notify::Always)
    }

    fn apply_lock(&mut self, notify: Notify) -> Result<(), AuthError> {
        let current = self.refresh()?;
        let mut machine = self.machine.clone();
        machine.on_lock();
        let next = LockRecord {
            is_locked: true,
            ..current
        };
        self.commit(
            &LockRecordPatch {
                is_locked: Some(true),
                ..LockRecordPatch::default()
            },
            next,
            machine,
            notify,
        )
    }

    fn refresh(&mut self) -> Result<LockRecord, AuthError> {
        let record = self.store.load()?;
        self.machine = LockStateMachine::from_record(&record);
        self.mirror = record.clone();
        Ok(record)
    }

    /// Persists `patch` first; the mirror and machine move only on success.
    fn commit(
        &mut self,
        patch: &LockRecordPatch,
        next: LockRecord,
        machine: LockStateMachine,
        notify: Notify,
    ) -> Result<(), AuthError> {
        let previous_effective = self.mirror.effective_locked();
        self.store.write(patch)?;
        self.mirror = next;
        if machine.state() != self.machine.state() {
            info!(from = ?self.machine.state(), to = ?machine.state(), "lock state changed");
        }
        self.machine = machine;
        self.notify(previous_effective, notify);
        Ok(())
    }

    fn notify(&self, previous_effective: bool, notify: Notify) {
        let changed = previous_effective != self.mirror.effective_locked();
        if notify == Notify::Always || changed {
            let reached = self.broadcaster.broadcast(Broadcast::LockStateChanged);
            debug!(reached, "lockStateChanged broadcast");
        }
    }
}

fn outcome(result: Result<(), AuthError>) -> LockResponse {
    match result {
        Ok(()) => LockResponse::Outcome(ActionOutcome::ok()),
        Err(error) => LockResponse::Outcome(ActionOutcome::failed(error.user_message())),
    }
}

/// Errors produced by the authorization service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password did not match the stored digest.
    #[error("invalid credential: {0}")]
    InvalidCredential(&'static str),
    /// Setup attempted while a password exists.
    #[error("password already configured")]
    AlreadyConfigured,
    /// Empty password reached the service.
    #[error("password must not be empty")]
    EmptyPassword,
    /// Credential store failure.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Message placed in the wire `error` field.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredential(message) => message,
            AuthError::AlreadyConfigured => MSG_PASSWORD_ALREADY_SET,
            AuthError::EmptyPassword => MSG_EMPTY_PASSWORD,
            AuthError::Storage(_) => MSG_STORAGE_UNAVAILABLE,
        }
    }
}
