//! In-process control hub: request/response transport plus broadcast fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::sync::{Arc, Mutex, Weak};

use profile_lock_auth::{AuthService, Broadcaster};
use profile_lock_core::{Broadcast, LifecycleEvent, LockRequest, LockResponse, LockSnapshot};
use profile_lock_overlay::{ContextHost, GuardConfig, LockClient, OverlayController, TransportError};
use profile_lock_store::{CredentialStore, KeyValueStore};
use tracing::{debug, info};

use crate::{AppConfig, AppError};

/// Identifier of a registered rendering context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

/// Broadcast fan-out over one channel per rendering context.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    next_id: AtomicU64,
    senders: Mutex<Vec<(ContextId, Sender<Broadcast>)>>,
}

impl ContextRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a context and returns its id and inbox.
    pub fn register(&self) -> (ContextId, Receiver<Broadcast>) {
        let id = ContextId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push((id, sender));
        }
        (id, receiver)
    }

    /// Number of contexts whose inbox is still registered.
    pub fn len(&self) -> usize {
        self.senders.lock().map(|senders| senders.len()).unwrap_or(0)
    }

    /// Returns `true` when no context is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Broadcaster for ContextRegistry {
    fn broadcast(&self, notice: Broadcast) -> usize {
        let Ok(mut senders) = self.senders.lock() else {
            return 0;
        };
        let before = senders.len();
        senders.retain(|(_, sender)| sender.send(notice).is_ok());
        let pruned = before - senders.len();
        if pruned > 0 {
            debug!(pruned, "closed context inboxes pruned");
        }
        senders.len()
    }
}

/// Control process: the single authorization service and its fan-out.
pub struct ControlHub {
    service: Mutex<AuthService>,
    registry: Arc<ContextRegistry>,
    guard: GuardConfig,
}

impl ControlHub {
    /// Loads the stored record and starts the hub. The caller delivers
    /// lifecycle events (startup, install) separately.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for invalid timings and
    /// [`AppError::Auth`] when the record cannot be loaded.
    pub fn new(backend: Arc<dyn KeyValueStore>, config: &AppConfig) -> Result<Arc<Self>, AppError> {
        let guard = config.guard.validate()?;
        let registry = Arc::new(ContextRegistry::new());
        let service = AuthService::new(CredentialStore::new(backend), registry.clone())?
            .with_idle_detection_secs(config.idle_detection_secs);
        info!(
            idle_detection_secs = service.idle_detection_secs(),
            "control hub started"
        );
        Ok(Arc::new(Self {
            service: Mutex::new(service),
            registry,
            guard,
        }))
    }

    /// Creates a client holding a weak reference to this hub.
    pub fn client(self: &Arc<Self>) -> HubClient {
        HubClient {
            hub: Arc::downgrade(self),
        }
    }

    /// Broadcast registry.
    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    /// Processes one request to completion.
    ///
    /// # Errors
    /// Returns [`TransportError::Unavailable`] when the service lock is
    /// poisoned.
    pub fn dispatch(&self, request: &LockRequest) -> Result<LockResponse, TransportError> {
        let mut service = self
            .service
            .lock()
            .map_err(|_| TransportError::Unavailable("control hub poisoned".to_string()))?;
        Ok(service.handle(request))
    }

    /// Decodes one wire request and processes it.
    ///
    /// # Errors
    /// Returns [`AppError::Core`] for malformed JSON and
    /// [`AppError::Transport`] when the hub is poisoned.
    pub fn dispatch_wire(&self, raw: &str) -> Result<LockResponse, AppError> {
        let request = LockRequest::from_json_bytes(raw.as_bytes())?;
        Ok(self.dispatch(&request)?)
    }

    /// Like [`Self::dispatch_wire`], with the response encoded back to JSON.
    ///
    /// # Errors
    /// Same as [`Self::dispatch_wire`], plus [`AppError::Core`] when encoding
    /// fails.
    pub fn dispatch_json(&self, raw: &str) -> Result<String, AppError> {
        let encoded = self.dispatch_wire(raw)?.to_json_bytes()?;
        Ok(String::from_utf8_lossy(&encoded).into_owned())
    }

    /// Applies a lifecycle signal.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when persistence fails.
    pub fn lifecycle(&self, event: LifecycleEvent) -> Result<(), AppError> {
        let mut service = self
            .service
            .lock()
            .map_err(|_| TransportError::Unavailable("control hub poisoned".to_string()))?;
        service.handle_lifecycle(event)?;
        Ok(())
    }

    /// Current `{isLocked, hasPassword}`.
    ///
    /// # Errors
    /// Returns [`AppError::Auth`] when the store cannot be read.
    pub fn snapshot(&self) -> Result<LockSnapshot, AppError> {
        let mut service = self
            .service
            .lock()
            .map_err(|_| TransportError::Unavailable("control hub poisoned".to_string()))?;
        Ok(service.get_lock_state()?)
    }

    /// Attaches a rendering context: registers its inbox and builds its
    /// controller. Call [`RenderingContext::activate`] when the context is
    /// ready.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the guard timings are invalid.
    pub fn attach<H: ContextHost>(
        self: &Arc<Self>,
        host: H,
    ) -> Result<RenderingContext<H>, AppError> {
        let client: Arc<dyn LockClient> = Arc::new(self.client());
        let controller = OverlayController::new(host, client, self.guard)?;
        let (id, inbox) = self.registry.register();
        debug!(context = id.0, "rendering context attached");
        Ok(RenderingContext {
            id,
            controller,
            inbox,
        })
    }
}

/// Transport handle used by rendering contexts.
#[derive(Debug, Clone)]
pub struct HubClient {
    hub: Weak<ControlHub>,
}

impl LockClient for HubClient {
    fn request(&self, request: &LockRequest) -> Result<LockResponse, TransportError> {
        let hub = self.hub.upgrade().ok_or_else(|| {
            TransportError::Unavailable("control process not running".to_string())
        })?;
        hub.dispatch(request)
    }
}

/// One rendering context: overlay controller plus broadcast inbox.
pub struct RenderingContext<H: ContextHost> {
    id: ContextId,
    controller: OverlayController<H>,
    inbox: Receiver<Broadcast>,
}

impl<H: ContextHost> RenderingContext<H> {
    /// Context id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Borrow the controller.
    pub fn controller(&self) -> &OverlayController<H> {
        &self.controller
    }

    /// Mutably borrow the controller.
    pub fn controller_mut(&mut self) -> &mut OverlayController<H> {
        &mut self.controller
    }

    /// Context became ready: queries state and guards when locked.
    pub fn activate(&mut self) {
        self.controller.activate();
    }

    /// Drains the inbox. Any number of pending notices collapse into one
    /// state re-query. Returns how many notices were drained.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0;
        let mut latest = None;
        loop {
            match self.inbox.try_recv() {
                Ok(notice) => {
                    drained += 1;
                    latest = Some(notice);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if let Some(notice) = latest {
            self.controller.on_broadcast(notice);
        }
        drained
    }

    /// Page unload.
    pub fn close(mut self) {
        self.controller.shutdown();
        debug!(context = self.id.0, "rendering context closed");
    }
}
