//! Per-context `Idle`/`Guarding` controller.

use std::sync::Arc;

use profile_lock_core::{
    ActionOutcome, Broadcast, LockRequest, LockResponse, MSG_INCORRECT_PASSWORD,
};
use tracing::{debug, info, warn};

use crate::client::{LockClient, TransportError, fetch_snapshot};
use crate::detection::{DetectionSignal, docked_inspector_signal};
use crate::hotkeys::{KeyDisposition, KeyInput, classify_key};
use crate::surface::{
    ContextHost, ListenerId, ListenerKind, OverlayView, SurfaceError, TAMPER_BANNER_TEXT, TimerId,
    TimerKind, blur_stylesheet,
};
use crate::{ConfigError, GuardConfig, MSG_ENTER_PASSWORD, MSG_SERVICE_UNREACHABLE};

/// Controller mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    /// Nothing injected, nothing scheduled.
    Idle,
    /// Overlay, blur, guard loop, detection, and key suppression active.
    Guarding,
}

/// Observable overlay state of one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayState {
    /// Overlay element attached.
    pub overlay_present: bool,
    /// Blur style applied.
    pub blur_active: bool,
    /// Reassertion loop and tamper probes running.
    pub guarding: bool,
}

/// Result of an overlay form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input; the service was not contacted.
    EmptyPassword,
    /// Service accepted the password; guarding stopped.
    Unlocked,
    /// Service rejected the password with this message.
    Rejected(String),
    /// Service unreachable; a state re-query was scheduled.
    Unreachable,
    /// No overlay is shown, so there is nothing to submit.
    NotGuarding,
}

/// Handles registered while guarding. Every field is released by
/// [`OverlayController::stop_guarding`].
#[derive(Debug, Default)]
struct GuardResources {
    guard_timer: Option<TimerId>,
    detection_timer: Option<TimerId>,
    focus_timer: Option<TimerId>,
    resize_listener: Option<ListenerId>,
    key_listener: Option<ListenerId>,
}

impl GuardResources {
    fn is_empty(&self) -> bool {
        self.guard_timer.is_none()
            && self.detection_timer.is_none()
            && self.focus_timer.is_none()
            && self.resize_listener.is_none()
            && self.key_listener.is_none()
    }
}

/// Tamper-resistant overlay controller for one rendering context.
pub struct OverlayController<H: ContextHost> {
    host: H,
    client: Arc<dyn LockClient>,
    config: GuardConfig,
    view: OverlayView,
    stylesheet: String,
    phase: GuardPhase,
    locked_view: bool,
    resources: GuardResources,
    retry_timer: Option<TimerId>,
}

impl<H: ContextHost> OverlayController<H> {
    /// Creates an idle controller. Call [`Self::activate`] once the context
    /// is ready.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `config` has a zero period or threshold.
    pub fn new(
        host: H,
        client: Arc<dyn LockClient>,
        config: GuardConfig,
    ) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let view = OverlayView::default();
        let stylesheet = blur_stylesheet(&view.element_id);
        Ok(Self {
            host,
            client,
            config,
            view,
            stylesheet,
            phase: GuardPhase::Idle,
            locked_view: false,
            resources: GuardResources::default(),
            retry_timer: None,
        })
    }

    /// Replaces the overlay content.
    pub fn with_view(mut self, view: OverlayView) -> Self {
        self.stylesheet = blur_stylesheet(&view.element_id);
        self.view = view;
        self
    }

    /// Borrow the host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutably borrow the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Current mode.
    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    /// Returns `true` while guarding.
    pub fn is_guarding(&self) -> bool {
        self.phase == GuardPhase::Guarding
    }

    /// This context's view of the effective lock state.
    pub fn locked_view(&self) -> bool {
        self.locked_view
    }

    /// Returns `true` when a state re-query is scheduled.
    pub fn retry_pending(&self) -> bool {
        self.retry_timer.is_some()
    }

    /// Snapshot of overlay, blur, and guarding flags.
    pub fn overlay_state(&self) -> OverlayState {
        OverlayState {
            overlay_present: self.host.has_overlay(),
            blur_active: self.host.has_blur(),
            guarding: self.is_guarding(),
        }
    }

    /// Context became ready: query the service.
    pub fn activate(&mut self) {
        self.refresh_quietly();
    }

    /// Handles a broadcast. The payload is not trusted; state is re-queried.
    pub fn on_broadcast(&mut self, notice: Broadcast) {
        match notice {
            Broadcast::LockStateChanged => self.refresh_quietly(),
        }
    }

    /// Handles a visibility change; regaining visibility re-queries state.
    pub fn on_visibility_change(&mut self, visible: bool) {
        if visible {
            self.refresh_quietly();
        }
    }

    /// Dispatches a fired timer.
    pub fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::GuardLoop => self.guard_tick(),
            TimerKind::Detection => self.detection_tick(),
            TimerKind::Focus => {
                self.resources.focus_timer = None;
                if self.is_guarding() {
                    self.host.focus_password_input();
                }
            }
            TimerKind::Retry => {
                self.retry_timer = None;
                self.refresh_quietly();
            }
        }
    }

    /// Handles a window resize event.
    pub fn on_resize(&mut self) {
        if !self.is_guarding() || self.resources.resize_listener.is_none() {
            return;
        }
        if let Some(signal) =
            docked_inspector_signal(self.host.window_metrics(), self.config.size_threshold_px)
        {
            self.respond_to_tamper(signal);
        }
    }

    /// Decides whether a capture-phase keydown must be cancelled.
    pub fn on_key_down(&mut self, input: &KeyInput) -> KeyDisposition {
        if !self.is_guarding() || self.resources.key_listener.is_none() {
            return KeyDisposition::Allow;
        }
        match classify_key(input) {
            Some(kind) => {
                debug!(?kind, "bypass shortcut suppressed");
                KeyDisposition::Suppress
            }
            None => KeyDisposition::Allow,
        }
    }

    /// Submits the overlay form.
    pub fn submit_password(&mut self, password: &str) -> SubmitOutcome {
        if !self.is_guarding() {
            return SubmitOutcome::NotGuarding;
        }
        if password.is_empty() {
            self.host.show_form_message(MSG_ENTER_PASSWORD);
            return SubmitOutcome::EmptyPassword;
        }

        let request = LockRequest::Unlock {
            password: password.to_string(),
        };
        match self.client.request(&request) {
            Ok(LockResponse::Outcome(ActionOutcome { success: true, .. })) => {
                info!("unlock accepted; leaving guard mode");
                self.locked_view = false;
                self.stop_guarding();
                SubmitOutcome::Unlocked
            }
            Ok(response) => {
                let message = match response {
                    LockResponse::Outcome(ActionOutcome {
                        error: Some(message),
                        ..
                    }) => message,
                    _ => MSG_INCORRECT_PASSWORD.to_string(),
                };
                self.host.show_form_message(&message);
                self.host.clear_password_input();
                self.host.focus_password_input();
                SubmitOutcome::Rejected(message)
            }
            Err(error) => {
                debug!(%error, "unlock request failed");
                self.host.show_form_message(MSG_SERVICE_UNREACHABLE);
                self.host.clear_password_input();
                self.host.focus_password_input();
                self.schedule_retry();
                SubmitOutcome::Unreachable
            }
        }
    }

    /// Queries the effective lock state and enters or leaves guard mode.
    ///
    /// # Errors
    /// Returns the transport failure after scheduling a retry; the current
    /// mode is kept.
    pub fn refresh_lock_state(&mut self) -> Result<bool, TransportError> {
        match fetch_snapshot(self.client.as_ref()) {
            Ok(snapshot) => {
                let locked = snapshot.effective_locked();
                self.locked_view = locked;
                if locked {
                    self.start_guarding();
                } else {
                    self.stop_guarding();
                }
                Ok(locked)
            }
            Err(error) => {
                debug!(%error, "lock state query failed; retry scheduled");
                self.schedule_retry();
                Err(error)
            }
        }
    }

    /// Re-query for event handlers. On failure the current mode is kept and
    /// the retry is already scheduled.
    fn refresh_quietly(&mut self) {
        if let Err(error) = self.refresh_lock_state() {
            debug!(%error, retry_pending = self.retry_pending(), "mode kept");
        }
    }

    /// Enters guard mode. Safe to call while already guarding: missing
    /// artifacts are restored and nothing is registered twice.
    pub fn start_guarding(&mut self) {
        let entering = !self.is_guarding();
        self.locked_view = true;
        self.phase = GuardPhase::Guarding;
        self.reassert();

        if self.resources.guard_timer.is_none() {
            self.resources.guard_timer = Some(self.host.start_timer(
                TimerKind::GuardLoop,
                self.config.guard_interval_ms,
                true,
            ));
        }
        if self.resources.detection_timer.is_none() {
            self.resources.detection_timer = Some(self.host.start_timer(
                TimerKind::Detection,
                self.config.detection_interval_ms,
                true,
            ));
        }
        if self.resources.resize_listener.is_none() {
            self.resources.resize_listener = Some(self.host.add_listener(ListenerKind::Resize));
        }
        if self.resources.key_listener.is_none() {
            self.resources.key_listener =
                Some(self.host.add_listener(ListenerKind::KeyDownCapture));
        }
        if entering && self.resources.focus_timer.is_none() {
            self.resources.focus_timer = Some(self.host.start_timer(
                TimerKind::Focus,
                self.config.focus_delay_ms,
                false,
            ));
        }

        if entering {
            info!("guarding started");
        }
    }

    /// Leaves guard mode, releasing every timer, listener, and injected
    /// artifact. Safe to call repeatedly.
    pub fn stop_guarding(&mut self) {
        let was_guarding = self.is_guarding();

        for timer in [
            self.resources.guard_timer.take(),
            self.resources.detection_timer.take(),
            self.resources.focus_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.host.cancel_timer(timer);
        }
        for listener in [
            self.resources.resize_listener.take(),
            self.resources.key_listener.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.host.remove_listener(listener);
        }
        debug_assert!(self.resources.is_empty());

        if self.host.has_banner() {
            self.host.remove_banner();
        }
        if self.host.has_blur() {
            self.host.remove_blur();
        }
        if self.host.has_overlay() {
            self.host.remove_overlay();
        }

        self.phase = GuardPhase::Idle;
        if was_guarding {
            info!("guarding stopped");
        }
    }

    /// Page unload: stop guarding and drop any pending retry.
    pub fn shutdown(&mut self) {
        self.stop_guarding();
        if let Some(timer) = self.retry_timer.take() {
            self.host.cancel_timer(timer);
        }
    }

    /// Idempotent reaction to a tamper signal: re-display the block and show
    /// the informational banner once.
    pub fn respond_to_tamper(&mut self, signal: DetectionSignal) {
        if !self.is_guarding() {
            return;
        }
        warn!(?signal, "inspection tooling suspected; reasserting lock");
        self.reassert();
        if !self.host.has_banner()
            && let Err(error) = self.host.append_banner(TAMPER_BANNER_TEXT)
        {
            debug!(%error, "tamper banner not attached");
        }
    }

    fn guard_tick(&mut self) {
        if !self.locked_view || !self.is_guarding() {
            self.stop_guarding();
            return;
        }
        self.reassert();
    }

    fn detection_tick(&mut self) {
        if !self.locked_view || !self.is_guarding() {
            self.stop_guarding();
            return;
        }
        let signal =
            docked_inspector_signal(self.host.window_metrics(), self.config.size_threshold_px)
                .or_else(|| {
                    self.host
                        .probe_console()
                        .then_some(DetectionSignal::ConsoleProbe)
                });
        if let Some(signal) = signal {
            self.respond_to_tamper(signal);
        }
    }

    /// Restores the overlay (present and first) and the blur. Each step runs
    /// even if an earlier one failed.
    fn reassert(&mut self) {
        match self.ensure_overlay() {
            Ok(true) => debug!("overlay restored"),
            Ok(false) => {}
            Err(error) => debug!(%error, "overlay reassertion failed; next tick retries"),
        }
        match self.ensure_blur() {
            Ok(true) => debug!("blur restored"),
            Ok(false) => {}
            Err(error) => debug!(%error, "blur reassertion failed; next tick retries"),
        }
    }

    fn ensure_overlay(&mut self) -> Result<bool, SurfaceError> {
        if !self.host.has_overlay() {
            self.host.insert_overlay_first(&self.view)?;
            return Ok(true);
        }
        if !self.host.overlay_is_first_child() {
            self.host.move_overlay_first()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn ensure_blur(&mut self) -> Result<bool, SurfaceError> {
        if self.host.has_blur() {
            return Ok(false);
        }
        self.host.apply_blur(&self.stylesheet)?;
        Ok(true)
    }

    fn schedule_retry(&mut self) {
        if self.retry_timer.is_none() {
            self.retry_timer = Some(self.host.start_timer(
                TimerKind::Retry,
                self.config.retry_backoff_ms,
                false,
            ));
        }
    }
}
