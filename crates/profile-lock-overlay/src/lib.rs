#![warn(missing_docs)]
//! # profile-lock-overlay
//!
//! ## Purpose
//! Per-context controller that blocks page content while the profile is
//! locked and keeps re-asserting that block against a user trying to remove it.
//!
//! ## Responsibilities
//! - Render the password overlay as the first child of the content root.
//! - Blur and disable every sibling of the overlay while guarding.
//! - Run a bounded-interval guard loop that restores removed or displaced
//!   artifacts and stops itself once the context sees the profile unlocked.
//! - Run advisory tamper heuristics (docked inspector, console probe) that
//!   feed one idempotent response action.
//! - Suppress inspector and view-source hotkeys while guarding.
//! - Submit unlock attempts to the authorization service.
//!
//! ## Data flow
//! Broadcast / visibility regain -> [`OverlayController::refresh_lock_state`]
//! queries the service through [`LockClient`] -> `Idle` or `Guarding`. While
//! guarding, the host feeds timer, resize, and keydown events back into the
//! controller, which drives the [`RenderSurface`].
//!
//! ## Ownership and lifetimes
//! Each controller owns its host (surface + event loop) and every timer and
//! listener handle it registered, so a single [`OverlayController::stop_guarding`]
//! removes all of them. The transport is shared as `Arc<dyn LockClient>`.
//!
//! ## Error model
//! Transport failures return [`TransportError`] and schedule a retry. Surface
//! failures inside a tick are logged and swallowed; the next tick tries again.
//!
//! ## Security and privacy notes
//! This is not an access-control boundary. Detection is best-effort and only
//! raises the effort needed for casual snooping. Passwords are passed through
//! to the service and never retained or logged.

mod client;
mod controller;
mod detection;
mod hotkeys;
mod surface;
mod synthetic;

use thiserror::Error;

pub use client::{LockClient, TransportError, fetch_snapshot};
pub use controller::{GuardPhase, OverlayController, OverlayState, SubmitOutcome};
pub use detection::{DetectionSignal, docked_inspector_signal};
pub use hotkeys::{BypassKey, KeyDisposition, KeyInput, classify_key};
pub use surface::{
    BANNER_ELEMENT_ID, BLUR_STYLE_ID, ContextHost, EventLoop, ListenerId, ListenerKind,
    OVERLAY_ELEMENT_ID, OverlayView, RenderSurface, SurfaceError, TAMPER_BANNER_TEXT, TimerId,
    TimerKind, WindowMetrics, blur_stylesheet,
};
pub use synthetic::SyntheticSurface;

/// Message shown when the overlay form is submitted empty.
pub const MSG_ENTER_PASSWORD: &str = "Please enter your password";
/// Message shown when the service cannot be reached from the overlay form.
pub const MSG_SERVICE_UNREACHABLE: &str = "Profile lock service unavailable, try again";

/// Timing and threshold configuration for guard and detection loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// Guard loop period in milliseconds.
    pub guard_interval_ms: u64,
    /// Detection probe period in milliseconds.
    pub detection_interval_ms: u64,
    /// Outer/inner window delta, in pixels, treated as a docked inspector.
    pub size_threshold_px: u32,
    /// Delay before retrying an unreachable service.
    pub retry_backoff_ms: u64,
    /// Delay before focusing the password input after render.
    pub focus_delay_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            guard_interval_ms: 300,
            detection_interval_ms: 1_000,
            size_threshold_px: 160,
            retry_backoff_ms: 1_000,
            focus_delay_ms: 100,
        }
    }
}

impl GuardConfig {
    /// Validates a configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroInterval`] when any period is zero and
    /// [`ConfigError::ZeroThreshold`] when the size threshold is zero.
    pub fn validate(self) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("guard_interval_ms", self.guard_interval_ms),
            ("detection_interval_ms", self.detection_interval_ms),
            ("retry_backoff_ms", self.retry_backoff_ms),
            ("focus_delay_ms", self.focus_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        if self.size_threshold_px == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        Ok(self)
    }
}

/// Guard configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A timer period was zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    /// Size threshold was zero.
    #[error("size threshold must be greater than zero")]
    ZeroThreshold,
}
