//! Host seams: the rendering surface and the event loop of one context.

use thiserror::Error;

/// Element id of the blocking overlay.
pub const OVERLAY_ELEMENT_ID: &str = "profile-lock-overlay";
/// Element id of the injected blur style.
pub const BLUR_STYLE_ID: &str = "profile-lock-blur";
/// Element id of the informational tamper banner.
pub const BANNER_ELEMENT_ID: &str = "profile-lock-tamper-banner";
/// Text of the informational tamper banner.
pub const TAMPER_BANNER_TEXT: &str =
    "Inspection tools detected. Close them and enter your password to continue.";

/// Static content of the overlay form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayView {
    /// Overlay element id.
    pub element_id: String,
    /// Heading.
    pub title: String,
    /// Instruction under the heading.
    pub prompt: String,
    /// Password input placeholder.
    pub placeholder: String,
    /// Submit button label.
    pub submit_label: String,
}

impl Default for OverlayView {
    fn default() -> Self {
        Self {
            element_id: OVERLAY_ELEMENT_ID.to_string(),
            title: "Profile Locked".to_string(),
            prompt: "Enter your password to unlock this profile".to_string(),
            placeholder: "Password".to_string(),
            submit_label: "Unlock".to_string(),
        }
    }
}

/// Builds the style rule that blurs every sibling of the overlay and freezes
/// document scrolling. The tamper banner stays readable.
pub fn blur_stylesheet(overlay_id: &str) -> String {
    format!(
        "body > *:not(#{overlay_id}):not(#{BANNER_ELEMENT_ID}) {{ \
         filter: blur(20px) !important; pointer-events: none !important; \
         user-select: none !important; }} \
         html, body {{ overflow: hidden !important; }}"
    )
}

/// Outer and inner window dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowMetrics {
    /// Outer window width.
    pub outer_width: u32,
    /// Viewport width.
    pub inner_width: u32,
    /// Outer window height.
    pub outer_height: u32,
    /// Viewport height.
    pub inner_height: u32,
}

impl WindowMetrics {
    /// Window with no docked panels.
    pub fn undocked(width: u32, height: u32) -> Self {
        Self {
            outer_width: width,
            inner_width: width,
            outer_height: height,
            inner_height: height,
        }
    }

    /// Outer minus inner width, never negative.
    pub fn width_delta(&self) -> u32 {
        self.outer_width.saturating_sub(self.inner_width)
    }

    /// Outer minus inner height, never negative.
    pub fn height_delta(&self) -> u32 {
        self.outer_height.saturating_sub(self.inner_height)
    }
}

/// Recurring and one-shot callbacks a controller schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Overlay/blur reassertion loop.
    GuardLoop,
    /// Tamper heuristics.
    Detection,
    /// Deferred focus of the password input.
    Focus,
    /// Retry of a failed state query.
    Retry,
}

/// Handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Event listeners a controller attaches while guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// Window resize.
    Resize,
    /// Keydown at the earliest capture point.
    KeyDownCapture,
}

/// Handle of an attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Document operations the controller needs from its rendering context.
pub trait RenderSurface {
    /// Returns `true` when the overlay element is attached.
    fn has_overlay(&self) -> bool;

    /// Returns `true` when the overlay is the first child of the content root.
    fn overlay_is_first_child(&self) -> bool;

    /// Inserts the overlay as the first child of the content root.
    ///
    /// # Errors
    /// Returns [`SurfaceError`] when the content root is unavailable.
    fn insert_overlay_first(&mut self, view: &OverlayView) -> Result<(), SurfaceError>;

    /// Moves an attached overlay back to the first-child slot.
    ///
    /// # Errors
    /// Returns [`SurfaceError`] when the overlay or content root is gone.
    fn move_overlay_first(&mut self) -> Result<(), SurfaceError>;

    /// Detaches the overlay.
    fn remove_overlay(&mut self);

    /// Returns `true` when the blur style is applied.
    fn has_blur(&self) -> bool;

    /// Injects the blur style.
    ///
    /// # Errors
    /// Returns [`SurfaceError`] when the style cannot be attached.
    fn apply_blur(&mut self, stylesheet: &str) -> Result<(), SurfaceError>;

    /// Removes the blur style.
    fn remove_blur(&mut self);

    /// Returns `true` when the tamper banner is attached.
    fn has_banner(&self) -> bool;

    /// Appends the tamper banner.
    ///
    /// # Errors
    /// Returns [`SurfaceError`] when the banner cannot be attached.
    fn append_banner(&mut self, text: &str) -> Result<(), SurfaceError>;

    /// Removes the tamper banner.
    fn remove_banner(&mut self);

    /// Shows a message under the overlay form.
    fn show_form_message(&mut self, message: &str);

    /// Empties the password input.
    fn clear_password_input(&mut self);

    /// Focuses the password input.
    fn focus_password_input(&mut self);

    /// Current window dimensions.
    fn window_metrics(&self) -> WindowMetrics;

    /// Logs a formatting object whose accessor reports whether an inspection
    /// console formatted it. Returns `true` when the accessor fired.
    fn probe_console(&mut self) -> bool;
}

/// Scheduling operations of the context's single-threaded event loop.
pub trait EventLoop {
    /// Schedules `kind` after `delay_ms`, repeating with the same period when
    /// `repeating` is set.
    fn start_timer(&mut self, kind: TimerKind, delay_ms: u64, repeating: bool) -> TimerId;

    /// Cancels a timer. Unknown ids are ignored.
    fn cancel_timer(&mut self, id: TimerId);

    /// Attaches a listener.
    fn add_listener(&mut self, kind: ListenerKind) -> ListenerId;

    /// Detaches a listener. Unknown ids are ignored.
    fn remove_listener(&mut self, id: ListenerId);
}

/// Everything a controller needs from its rendering context.
pub trait ContextHost: RenderSurface + EventLoop {}

impl<T: RenderSurface + EventLoop> ContextHost for T {}

/// Rendering surface failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// Neither the body nor the document element is available yet.
    #[error("content root unavailable")]
    ContentRootMissing,
    /// An element the operation depends on was detached.
    #[error("element detached: {0}")]
    Detached(&'static str),
}
