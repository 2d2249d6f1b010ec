//! Shared fixtures for overlay controller integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use profile_lock_core::{
    ActionOutcome, LockRequest, LockResponse, LockSnapshot, MSG_INCORRECT_PASSWORD,
};
use profile_lock_overlay::{
    GuardConfig, LockClient, OverlayController, SyntheticSurface, TransportError,
};

/// Scripted service: answers state queries from a snapshot and accepts one
/// password.
#[derive(Debug)]
pub struct ScriptedClient {
    snapshot: Mutex<LockSnapshot>,
    password: String,
    unavailable: AtomicBool,
    requests: AtomicUsize,
}

impl ScriptedClient {
    /// Service whose profile is configured with `password` and locked.
    pub fn locked(password: &str) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(LockSnapshot {
                is_locked: true,
                has_password: true,
            }),
            password: password.to_string(),
            unavailable: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        })
    }

    /// Service without a configured password.
    #[allow(dead_code)]
    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(LockSnapshot {
                is_locked: true,
                has_password: false,
            }),
            password: String::new(),
            unavailable: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        })
    }

    /// Toggles whether requests fail with [`TransportError::Unavailable`].
    #[allow(dead_code)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Overrides the lock flag as another context would.
    #[allow(dead_code)]
    pub fn set_locked(&self, locked: bool) {
        self.snapshot.lock().expect("snapshot lock").is_locked = locked;
    }

    /// Number of requests received, including failed ones.
    #[allow(dead_code)]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl LockClient for ScriptedClient {
    fn request(&self, request: &LockRequest) -> Result<LockResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable(
                "receiving end does not exist".to_string(),
            ));
        }

        let mut snapshot = self.snapshot.lock().expect("snapshot lock");
        let response = match request {
            LockRequest::GetLockState => LockResponse::State(*snapshot),
            LockRequest::Unlock { password } if *password == self.password => {
                snapshot.is_locked = false;
                LockResponse::Outcome(ActionOutcome::ok())
            }
            LockRequest::Unlock { .. } => {
                LockResponse::Outcome(ActionOutcome::failed(MSG_INCORRECT_PASSWORD))
            }
            LockRequest::Lock => {
                snapshot.is_locked = true;
                LockResponse::Outcome(ActionOutcome::ok())
            }
            _ => LockResponse::Outcome(ActionOutcome::failed("not scripted")),
        };
        Ok(response)
    }
}

/// Controller over a fresh synthetic surface with default timings.
pub fn controller(client: Arc<ScriptedClient>) -> OverlayController<SyntheticSurface> {
    OverlayController::new(SyntheticSurface::new(), client, GuardConfig::default())
        .expect("default timings are valid")
}

/// Controller that has already activated against a locked service.
#[allow(dead_code)]
pub fn guarding_controller(
    password: &str,
) -> (OverlayController<SyntheticSurface>, Arc<ScriptedClient>) {
    let client = ScriptedClient::locked(password);
    let mut controller = controller(client.clone());
    controller.activate();
    assert!(controller.is_guarding(), "locked service should start guarding");
    (controller, client)
}
