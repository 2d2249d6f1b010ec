//! Advisory tamper heuristics.
//!
//! Both heuristics are racy and can be defeated (undocked inspectors, patched
//! console). They only feed the tamper-response action.

use crate::surface::WindowMetrics;

/// Ephemeral tamper signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSignal {
    /// Outer/inner window delta beyond the threshold.
    DockedInspector {
        /// Outer minus inner width.
        width_delta: u32,
        /// Outer minus inner height.
        height_delta: u32,
    },
    /// The console probe accessor fired.
    ConsoleProbe,
}

/// Returns a signal when either window delta exceeds `threshold_px`.
pub fn docked_inspector_signal(
    metrics: WindowMetrics,
    threshold_px: u32,
) -> Option<DetectionSignal> {
    let width_delta = metrics.width_delta();
    let height_delta = metrics.height_delta();
    (width_delta > threshold_px || height_delta > threshold_px).then_some(
        DetectionSignal::DockedInspector {
            width_delta,
            height_delta,
        },
    )
}
