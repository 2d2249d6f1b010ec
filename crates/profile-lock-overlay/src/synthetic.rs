//! In-memory rendering context with a virtual clock.
//!
//! Used by tests and smoke runs in place of a real document and event loop.

use std::collections::BTreeMap;

use crate::controller::OverlayController;
use crate::hotkeys::{KeyDisposition, KeyInput};
use crate::surface::{
    EventLoop, ListenerId, ListenerKind, OverlayView, RenderSurface, SurfaceError, TimerId,
    TimerKind, WindowMetrics,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Overlay,
    Banner,
    Content(String),
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTimer {
    kind: TimerKind,
    due_ms: u64,
    period_ms: Option<u64>,
}

/// Synthetic document plus event loop.
#[derive(Debug)]
pub struct SyntheticSurface {
    children: Vec<Node>,
    content_root: bool,
    blur: Option<String>,
    rendered_view: Option<OverlayView>,
    form_message: Option<String>,
    password_input: String,
    focus_count: usize,
    metrics: WindowMetrics,
    console_open: bool,
    console_probes: usize,
    now_ms: u64,
    next_id: u64,
    timers: BTreeMap<TimerId, ScheduledTimer>,
    listeners: BTreeMap<ListenerId, ListenerKind>,
}

impl Default for SyntheticSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSurface {
    /// Page with one content node and an undocked 1280x800 window.
    pub fn new() -> Self {
        Self {
            children: vec![Node::Content("page".to_string())],
            content_root: true,
            blur: None,
            rendered_view: None,
            form_message: None,
            password_input: String::new(),
            focus_count: 0,
            metrics: WindowMetrics::undocked(1_280, 800),
            console_open: false,
            console_probes: 0,
            now_ms: 0,
            next_id: 1,
            timers: BTreeMap::new(),
            listeners: BTreeMap::new(),
        }
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of overlay elements attached.
    pub fn overlay_count(&self) -> usize {
        self.children.iter().filter(|n| **n == Node::Overlay).count()
    }

    /// Number of banner elements attached.
    pub fn banner_count(&self) -> usize {
        self.children.iter().filter(|n| **n == Node::Banner).count()
    }

    /// Stylesheet currently applied, if any.
    pub fn blur_stylesheet(&self) -> Option<&str> {
        self.blur.as_deref()
    }

    /// View rendered by the last overlay insertion.
    pub fn rendered_view(&self) -> Option<&OverlayView> {
        self.rendered_view.as_ref()
    }

    /// Message currently shown under the form.
    pub fn form_message(&self) -> Option<&str> {
        self.form_message.as_deref()
    }

    /// Value of the password input.
    pub fn password_input(&self) -> &str {
        &self.password_input
    }

    /// Types into the password input.
    pub fn type_password(&mut self, value: &str) {
        self.password_input = value.to_string();
    }

    /// How many times the input received focus.
    pub fn focus_count(&self) -> usize {
        self.focus_count
    }

    /// How many console probes ran.
    pub fn console_probes(&self) -> usize {
        self.console_probes
    }

    /// Timers still scheduled.
    pub fn active_timers(&self) -> Vec<TimerKind> {
        self.timers.values().map(|t| t.kind).collect()
    }

    /// Listeners still attached.
    pub fn active_listeners(&self) -> Vec<ListenerKind> {
        self.listeners.values().copied().collect()
    }

    /// Returns `true` when a listener of `kind` is attached.
    pub fn has_listener(&self, kind: ListenerKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    /// Simulates a user deleting the overlay from the inspector.
    pub fn remove_overlay_externally(&mut self) {
        self.children.retain(|n| *n != Node::Overlay);
    }

    /// Simulates a user deleting the blur style.
    pub fn remove_blur_externally(&mut self) {
        self.blur = None;
    }

    /// Inserts a content node ahead of the overlay.
    pub fn prepend_content(&mut self, name: &str) {
        self.children.insert(0, Node::Content(name.to_string()));
    }

    /// Makes the content root unavailable or available again.
    pub fn set_content_root(&mut self, available: bool) {
        self.content_root = available;
    }

    /// Opens or closes the simulated inspection console.
    pub fn set_console_open(&mut self, open: bool) {
        self.console_open = open;
    }

    /// Replaces window dimensions without dispatching a resize.
    pub fn set_metrics(&mut self, metrics: WindowMetrics) {
        self.metrics = metrics;
    }

    /// Removes the earliest timer due at or before `until_ms`, advances the
    /// clock to it, and re-arms it when repeating.
    pub fn pop_due_timer(&mut self, until_ms: u64) -> Option<TimerKind> {
        let (id, timer) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(id, t)| (t.due_ms, **id))
            .map(|(id, t)| (*id, *t))?;

        self.now_ms = timer.due_ms;
        match timer.period_ms {
            Some(period) => {
                if let Some(entry) = self.timers.get_mut(&id) {
                    entry.due_ms = timer.due_ms + period;
                }
            }
            None => {
                self.timers.remove(&id);
            }
        }
        Some(timer.kind)
    }

    fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require_root(&self) -> Result<(), SurfaceError> {
        if self.content_root {
            Ok(())
        } else {
            Err(SurfaceError::ContentRootMissing)
        }
    }
}

impl RenderSurface for SyntheticSurface {
    fn has_overlay(&self) -> bool {
        self.children.contains(&Node::Overlay)
    }

    fn overlay_is_first_child(&self) -> bool {
        self.children.first() == Some(&Node::Overlay)
    }

    fn insert_overlay_first(&mut self, view: &OverlayView) -> Result<(), SurfaceError> {
        self.require_root()?;
        self.children.insert(0, Node::Overlay);
        self.rendered_view = Some(view.clone());
        Ok(())
    }

    fn move_overlay_first(&mut self) -> Result<(), SurfaceError> {
        self.require_root()?;
        let position = self
            .children
            .iter()
            .position(|n| *n == Node::Overlay)
            .ok_or(SurfaceError::Detached("overlay"))?;
        let node = self.children.remove(position);
        self.children.insert(0, node);
        Ok(())
    }

    fn remove_overlay(&mut self) {
        self.children.retain(|n| *n != Node::Overlay);
    }

    fn has_blur(&self) -> bool {
        self.blur.is_some()
    }

    fn apply_blur(&mut self, stylesheet: &str) -> Result<(), SurfaceError> {
        self.require_root()?;
        self.blur = Some(stylesheet.to_string());
        Ok(())
    }

    fn remove_blur(&mut self) {
        self.blur = None;
    }

    fn has_banner(&self) -> bool {
        self.children.contains(&Node::Banner)
    }

    fn append_banner(&mut self, _text: &str) -> Result<(), SurfaceError> {
        self.require_root()?;
        self.children.push(Node::Banner);
        Ok(())
    }

    fn remove_banner(&mut self) {
        self.children.retain(|n| *n != Node::Banner);
    }

    fn show_form_message(&mut self, message: &str) {
        self.form_message = Some(message.to_string());
    }

    fn clear_password_input(&mut self) {
        self.password_input.clear();
    }

    fn focus_password_input(&mut self) {
        self.focus_count += 1;
    }

    fn window_metrics(&self) -> WindowMetrics {
        self.metrics
    }

    fn probe_console(&mut self) -> bool {
        self.console_probes += 1;
        self.console_open
    }
}

impl EventLoop for SyntheticSurface {
    fn start_timer(&mut self, kind: TimerKind, delay_ms: u64, repeating: bool) -> TimerId {
        let id = TimerId(self.allocate_id());
        self.timers.insert(
            id,
            ScheduledTimer {
                kind,
                due_ms: self.now_ms + delay_ms,
                period_ms: repeating.then_some(delay_ms),
            },
        );
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }

    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId {
        let id = ListenerId(self.allocate_id());
        self.listeners.insert(id, kind);
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}

impl OverlayController<SyntheticSurface> {
    /// Advances virtual time by `ms`, firing every timer that falls due in
    /// order.
    pub fn advance_clock(&mut self, ms: u64) {
        let until = self.host().now_ms() + ms;
        while let Some(kind) = self.host_mut().pop_due_timer(until) {
            self.on_timer(kind);
        }
        self.host_mut().set_now(until);
    }

    /// Changes window dimensions and delivers a resize event when a resize
    /// listener is attached.
    pub fn dispatch_resize(&mut self, metrics: WindowMetrics) {
        self.host_mut().set_metrics(metrics);
        if self.host().has_listener(ListenerKind::Resize) {
            self.on_resize();
        }
    }

    /// Delivers a keydown when a capture listener is attached.
    pub fn dispatch_key(&mut self, input: &KeyInput) -> KeyDisposition {
        if self.host().has_listener(ListenerKind::KeyDownCapture) {
            self.on_key_down(input)
        } else {
            KeyDisposition::Allow
        }
    }

    /// Submits whatever is typed in the password input.
    pub fn submit_typed(&mut self) -> crate::SubmitOutcome {
        let typed = self.host().password_input().to_string();
        self.submit_password(&typed)
    }
}
