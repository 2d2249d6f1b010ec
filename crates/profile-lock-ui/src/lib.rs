#![warn(missing_docs)]
//! # profile-lock-ui
//!
//! ## Purpose
//! Defines the settings-surface state model for `profile-lock`.
//!
//! ## Responsibilities
//! - Project a [`LockSnapshot`] into the visible section and status line.
//! - Validate setup, unlock, change, and remove forms before anything is sent.
//! - Build the [`LockRequest`] for a valid form.
//! - Map service outcomes to form messages and the next refresh.
//!
//! ## Data flow
//! `getLockState` response -> [`PopupState::from_snapshot`]; form input ->
//! `*Form::to_request` -> service -> [`PopupState::apply_outcome`].
//!
//! ## Ownership and lifetimes
//! Forms and state own their strings; nothing borrows from the transport.
//!
//! ## Error model
//! Invalid input is reported as [`ValidationError`] and never reaches the
//! service. Service failures arrive as [`ActionOutcome`] and become messages.
//!
//! ## Security and privacy notes
//! Form structs hold plaintext passwords only until the request is built;
//! their `Debug` output redacts them.

use std::fmt;

use profile_lock_core::{ActionOutcome, LockRequest, LockSnapshot};
use thiserror::Error;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;
/// How long a form message stays visible.
pub const MESSAGE_CLEAR_MS: u64 = 3_000;
/// Delay between a successful password change and the state refresh.
pub const CHANGE_SUCCESS_REFRESH_MS: u64 = 1_500;
/// Confirmation shown after a successful password change.
pub const MSG_PASSWORD_CHANGED: &str = "Password changed successfully!";

/// Form-level validation failures. The display text is shown verbatim.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Setup form submitted without a password.
    #[error("Please enter a password")]
    MissingPassword,
    /// Setup password shorter than [`MIN_PASSWORD_LEN`].
    #[error("Password must be at least 4 characters")]
    PasswordTooShort,
    /// Setup password and confirmation differ.
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// Change form missing the current or the new password.
    #[error("Please fill in all fields")]
    MissingFields,
    /// New password shorter than [`MIN_PASSWORD_LEN`].
    #[error("New password must be at least 4 characters")]
    NewPasswordTooShort,
    /// New password and confirmation differ.
    #[error("New passwords do not match")]
    NewPasswordMismatch,
    /// Unlock or remove form submitted empty.
    #[error("Please enter your password")]
    MissingCurrentPassword,
}

/// Which form a message or outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// First-time password setup.
    Setup,
    /// Unlock from the settings surface.
    Unlock,
    /// Password change.
    Change,
    /// Password removal.
    Remove,
}

impl FormKind {
    fn failure_fallback(self) -> &'static str {
        match self {
            FormKind::Setup => "Failed to set password",
            FormKind::Unlock | FormKind::Remove => "Incorrect password",
            FormKind::Change => "Failed to change password",
        }
    }
}

/// Setup form.
#[derive(Clone, PartialEq, Eq)]
pub struct SetupForm {
    /// New password.
    pub password: String,
    /// Confirmation.
    pub confirm: String,
    /// Auto-lock checkbox.
    pub auto_lock: bool,
}

impl SetupForm {
    /// Validates and builds `setPassword`.
    ///
    /// # Errors
    /// Returns the first failed check in display order.
    pub fn to_request(&self) -> Result<LockRequest, ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        if char_len(&self.password) < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort);
        }
        if self.password != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(LockRequest::SetPassword {
            password: self.password.clone(),
            auto_lock_enabled: Some(self.auto_lock),
        })
    }
}

/// Unlock form.
#[derive(Clone, PartialEq, Eq)]
pub struct UnlockForm {
    /// Entered password.
    pub password: String,
}

impl UnlockForm {
    /// Validates and builds `unlock`.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingCurrentPassword`] for empty input.
    pub fn to_request(&self) -> Result<LockRequest, ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingCurrentPassword);
        }
        Ok(LockRequest::Unlock {
            password: self.password.clone(),
        })
    }
}

/// Change-password form.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeForm {
    /// Current password.
    pub current: String,
    /// Replacement password.
    pub new_password: String,
    /// Confirmation of the replacement.
    pub confirm: String,
}

impl ChangeForm {
    /// Validates and builds `changePassword`.
    ///
    /// # Errors
    /// Returns the first failed check in display order.
    pub fn to_request(&self) -> Result<LockRequest, ValidationError> {
        if self.current.is_empty() || self.new_password.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if char_len(&self.new_password) < MIN_PASSWORD_LEN {
            return Err(ValidationError::NewPasswordTooShort);
        }
        if self.new_password != self.confirm {
            return Err(ValidationError::NewPasswordMismatch);
        }
        Ok(LockRequest::ChangePassword {
            current_password: self.current.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

/// Remove-password form.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoveForm {
    /// Current password.
    pub password: String,
}

impl RemoveForm {
    /// Validates and builds `removePassword`.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingCurrentPassword`] for empty input.
    pub fn to_request(&self) -> Result<LockRequest, ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingCurrentPassword);
        }
        Ok(LockRequest::RemovePassword {
            password: self.password.clone(),
        })
    }
}

macro_rules! redacted_debug {
    ($ty:ident { $($field:ident),* } secret { $($secret:ident),* }) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))*
                    $(.field(stringify!($secret), &"<redacted>"))*
                    .finish()
            }
        }
    };
}

redacted_debug!(SetupForm { auto_lock } secret { password, confirm });
redacted_debug!(UnlockForm {} secret { password });
redacted_debug!(ChangeForm {} secret { current, new_password, confirm });
redacted_debug!(RemoveForm {} secret { password });

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Visible settings section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupSection {
    /// No password configured.
    Setup,
    /// Locked; offers unlock.
    Locked,
    /// Unlocked; offers lock, change, remove.
    Unlocked,
    /// Change-password form.
    ChangePassword,
    /// Remove-password form.
    RemovePassword,
}

/// Status badge styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Red badge.
    Locked,
    /// Green badge.
    Unlocked,
}

/// Message shown under a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormMessage {
    /// Form the message belongs to.
    pub form: FormKind,
    /// Message text.
    pub text: String,
    /// Error styling when `true`, success styling otherwise.
    pub is_error: bool,
}

/// What the surface should do after an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Re-query lock state now.
    Refresh,
    /// Re-query lock state after the given delay.
    RefreshAfter(u64),
    /// Keep the current section.
    Stay,
}

/// Settings surface state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Section currently shown.
    pub section: PopupSection,
    /// Badge styling.
    pub tone: StatusTone,
    /// Status line.
    pub status_text: String,
    /// Last form message, if any.
    pub message: Option<FormMessage>,
}

impl PopupState {
    /// Projects a state snapshot.
    pub fn from_snapshot(version: impl Into<String>, snapshot: LockSnapshot) -> Self {
        let (section, tone, status_text) = project(snapshot);
        Self {
            version: version.into(),
            section,
            tone,
            status_text: status_text.to_string(),
            message: None,
        }
    }

    /// Re-projects after a state refresh; clears any message.
    pub fn refresh(&mut self, snapshot: LockSnapshot) {
        let (section, tone, status_text) = project(snapshot);
        self.section = section;
        self.tone = tone;
        self.status_text = status_text.to_string();
        self.message = None;
    }

    /// Opens the change form. Only reachable from the unlocked section.
    pub fn open_change_password(&mut self) -> bool {
        self.open_from_unlocked(PopupSection::ChangePassword)
    }

    /// Opens the remove form. Only reachable from the unlocked section.
    pub fn open_remove_password(&mut self) -> bool {
        self.open_from_unlocked(PopupSection::RemovePassword)
    }

    /// Records a validation failure on `form`.
    pub fn reject(&mut self, form: FormKind, error: ValidationError) {
        self.message = Some(FormMessage {
            form,
            text: error.to_string(),
            is_error: true,
        });
    }

    /// Applies a service outcome for `form` and returns the follow-up.
    pub fn apply_outcome(&mut self, form: FormKind, outcome: &ActionOutcome) -> NextStep {
        if outcome.success {
            if form == FormKind::Change {
                self.message = Some(FormMessage {
                    form,
                    text: MSG_PASSWORD_CHANGED.to_string(),
                    is_error: false,
                });
                return NextStep::RefreshAfter(CHANGE_SUCCESS_REFRESH_MS);
            }
            return NextStep::Refresh;
        }

        let text = outcome
            .error
            .clone()
            .unwrap_or_else(|| form.failure_fallback().to_string());
        self.message = Some(FormMessage {
            form,
            text,
            is_error: true,
        });
        NextStep::Stay
    }

    fn open_from_unlocked(&mut self, section: PopupSection) -> bool {
        if self.section != PopupSection::Unlocked {
            return false;
        }
        self.section = section;
        self.message = None;
        true
    }
}

fn project(snapshot: LockSnapshot) -> (PopupSection, StatusTone, &'static str) {
    if !snapshot.has_password {
        (PopupSection::Setup, StatusTone::Unlocked, "No password set")
    } else if snapshot.is_locked {
        (PopupSection::Locked, StatusTone::Locked, "Profile is locked")
    } else {
        (PopupSection::Unlocked, StatusTone::Unlocked, "Profile is unlocked")
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for section projection and form checks.

    use super::*;

    #[test]
    fn stale_locked_flag_without_password_shows_setup() {
        let state = PopupState::from_snapshot(
            "0.1.0",
            LockSnapshot {
                is_locked: true,
                has_password: false,
            },
        );
        assert_eq!(state.section, PopupSection::Setup);
        assert_eq!(state.status_text, "No password set");
    }

    #[test]
    fn setup_checks_run_in_display_order() {
        let form = SetupForm {
            password: "ab".to_string(),
            confirm: "zz".to_string(),
            auto_lock: true,
        };
        assert_eq!(form.to_request(), Err(ValidationError::PasswordTooShort));
    }

    #[test]
    fn form_debug_redacts_passwords() {
        let form = ChangeForm {
            current: "old-secret".to_string(),
            new_password: "new-secret".to_string(),
            confirm: "new-secret".to_string(),
        };
        let rendered = format!("{form:?}");
        assert!(!rendered.contains("old-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
