#![warn(missing_docs)]
//! # profile-lock-app
//!
//! ## Purpose
//! Wires the authorization service, overlay controllers, and settings surface
//! of `profile-lock` into one process.
//!
//! ## Responsibilities
//! - Load runtime configuration from the environment.
//! - Initialise structured logging.
//! - Host the service behind an in-process request/response transport.
//! - Fan `lockStateChanged` out to every attached rendering context.
//! - Provide the `profile-lock` command-line front end.
//!
//! ## Data flow
//! Rendering context -> [`HubClient`] -> [`ControlHub`] -> `AuthService` ->
//! store. State changes -> [`ContextRegistry`] -> context inbox ->
//! [`RenderingContext::pump`] -> state re-query.
//!
//! ## Ownership and lifetimes
//! The hub is shared as `Arc<ControlHub>`; clients hold only a `Weak` so a
//! dropped hub behaves like an unreachable control process. Each context owns
//! its controller and the receiving half of its inbox.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Transport failures seen by
//! contexts stay [`TransportError`] so controllers can retry.
//!
//! ## Security and privacy notes
//! Request logging goes through the redacting `Debug` of `LockRequest`;
//! passwords and digests are never logged.

mod hub;

use std::path::PathBuf;

use profile_lock_auth::{AuthError, DEFAULT_IDLE_DETECTION_SECS};
use profile_lock_core::CoreError;
use profile_lock_overlay::{ConfigError, GuardConfig, TransportError};
use profile_lock_ui::ValidationError;
use thiserror::Error;

pub use hub::{ContextId, ContextRegistry, ControlHub, HubClient, RenderingContext};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("PROFILE_LOCK_VERSION");

/// Store location used when `PROFILE_LOCK_STORE_PATH` is unset.
pub const DEFAULT_STORE_PATH: &str = "profile-lock.json";
/// Log filter used when `PROFILE_LOCK_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable names read by [`AppConfig::from_env`].
pub mod env_keys {
    /// Credential store file path.
    pub const STORE_PATH: &str = "PROFILE_LOCK_STORE_PATH";
    /// Guard loop period in milliseconds.
    pub const GUARD_INTERVAL_MS: &str = "PROFILE_LOCK_GUARD_INTERVAL_MS";
    /// Detection probe period in milliseconds.
    pub const DETECTION_INTERVAL_MS: &str = "PROFILE_LOCK_DETECTION_INTERVAL_MS";
    /// Retry backoff in milliseconds.
    pub const RETRY_BACKOFF_MS: &str = "PROFILE_LOCK_RETRY_BACKOFF_MS";
    /// Idle detection interval in seconds.
    pub const IDLE_SECONDS: &str = "PROFILE_LOCK_IDLE_SECONDS";
    /// Tracing filter directive.
    pub const LOG: &str = "PROFILE_LOCK_LOG";
}

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Credential store file.
    pub store_path: PathBuf,
    /// Overlay timings.
    pub guard: GuardConfig,
    /// Idle detection interval registered with the host idle source.
    pub idle_detection_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            guard: GuardConfig::default(),
            idle_detection_secs: DEFAULT_IDLE_DETECTION_SECS,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// Semantics:
    /// - Unset => default.
    /// - Unparsable or zero numeric values => default.
    /// - Empty store path => default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup` with the same semantics as
    /// [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, fallback: u64| positive(lookup(key)).unwrap_or(fallback);

        let store_path = lookup(env_keys::STORE_PATH)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        let guard = GuardConfig {
            guard_interval_ms: millis(
                env_keys::GUARD_INTERVAL_MS,
                defaults.guard.guard_interval_ms,
            ),
            detection_interval_ms: millis(
                env_keys::DETECTION_INTERVAL_MS,
                defaults.guard.detection_interval_ms,
            ),
            retry_backoff_ms: millis(env_keys::RETRY_BACKOFF_MS, defaults.guard.retry_backoff_ms),
            ..defaults.guard
        };

        Self {
            store_path,
            guard,
            idle_detection_secs: millis(env_keys::IDLE_SECONDS, defaults.idle_detection_secs),
        }
    }
}

fn positive(raw: Option<String>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// Installs the global `tracing` subscriber writing to stderr.
///
/// The filter comes from `PROFILE_LOCK_LOG` and defaults to `info`. Returns
/// `false` when a subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = std::env::var(env_keys::LOG)
        .ok()
        .and_then(|directive| tracing_subscriber::EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authorization service error.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
    /// Wire codec or lifecycle parse error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Invalid guard configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Control process unreachable.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Form input rejected before reaching the service.
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_garbage_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(|key| match key {
            env_keys::GUARD_INTERVAL_MS => Some("0".to_string()),
            env_keys::RETRY_BACKOFF_MS => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config, AppConfig::default());
    }
}
