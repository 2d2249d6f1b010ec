mod common;

use common::guarding_controller;
use profile_lock_overlay::{
    BANNER_ELEMENT_ID, DetectionSignal, KeyDisposition, KeyInput, OVERLAY_ELEMENT_ID, TimerKind,
    WindowMetrics,
};

fn docked_metrics() -> WindowMetrics {
    WindowMetrics {
        outer_width: 1_280,
        inner_width: 1_280,
        outer_height: 900,
        inner_height: 500,
    }
}

#[test]
fn tamper_response_is_idempotent() {
    let (mut controller, _client) = guarding_controller("hunter2");

    for _ in 0..5 {
        controller.respond_to_tamper(DetectionSignal::ConsoleProbe);
    }

    let surface = controller.host();
    assert_eq!(surface.overlay_count(), 1);
    assert_eq!(surface.banner_count(), 1);
    assert!(surface.blur_stylesheet().is_some());
}

#[test]
fn tamper_banner_is_exempt_from_blur_rule() {
    let (mut controller, _client) = guarding_controller("hunter2");
    controller.respond_to_tamper(DetectionSignal::ConsoleProbe);

    let surface = controller.host();
    assert_eq!(surface.banner_count(), 1);
    let stylesheet = surface.blur_stylesheet().expect("blur applied");
    assert!(stylesheet.contains(&format!(":not(#{OVERLAY_ELEMENT_ID})")));
    assert!(stylesheet.contains(&format!(":not(#{BANNER_ELEMENT_ID})")));
}

#[test]
fn tamper_resize_beyond_threshold_shows_banner_once() {
    let (mut controller, _client) = guarding_controller("hunter2");

    controller.dispatch_resize(docked_metrics());
    controller.dispatch_resize(docked_metrics());
    controller.advance_clock(3_000);

    assert_eq!(controller.host().banner_count(), 1);
    assert_eq!(controller.host().overlay_count(), 1);
}

#[test]
fn tamper_resize_within_threshold_is_ignored() {
    let (mut controller, _client) = guarding_controller("hunter2");

    controller.dispatch_resize(WindowMetrics {
        outer_width: 1_440,
        inner_width: 1_280,
        outer_height: 900,
        inner_height: 800,
    });

    assert_eq!(controller.host().banner_count(), 0);
}

#[test]
fn tamper_console_probe_runs_on_detection_interval() {
    let (mut controller, _client) = guarding_controller("hunter2");

    controller.advance_clock(999);
    assert_eq!(controller.host().console_probes(), 0);
    controller.advance_clock(1);
    assert_eq!(controller.host().console_probes(), 1);
    assert_eq!(controller.host().banner_count(), 0);

    controller.host_mut().set_console_open(true);
    controller.advance_clock(1_000);
    assert_eq!(controller.host().banner_count(), 1);
}

#[test]
fn tamper_detection_tick_reasserts_removed_overlay() {
    let (mut controller, _client) = guarding_controller("hunter2");
    controller.host_mut().set_console_open(true);
    controller.host_mut().remove_overlay_externally();

    controller.on_timer(TimerKind::Detection);

    assert_eq!(controller.host().overlay_count(), 1);
    assert_eq!(controller.host().banner_count(), 1);
}

#[test]
fn tamper_hotkeys_are_suppressed_while_guarding() {
    let (mut controller, _client) = guarding_controller("hunter2");

    for input in [
        KeyInput::plain("F12"),
        KeyInput::plain("I").ctrl().shift(),
        KeyInput::plain("J").ctrl().shift(),
        KeyInput::plain("C").ctrl().shift(),
        KeyInput::plain("i").meta().alt(),
        KeyInput::plain("∆").with_code("KeyJ").meta().alt(),
        KeyInput::plain("u").ctrl(),
        KeyInput::plain("Escape"),
    ] {
        assert_eq!(
            controller.dispatch_key(&input),
            KeyDisposition::Suppress,
            "{input:?} should be suppressed"
        );
    }

    assert_eq!(
        controller.dispatch_key(&KeyInput::plain("a")),
        KeyDisposition::Allow
    );
    assert_eq!(
        controller.dispatch_key(&KeyInput::plain("Enter")),
        KeyDisposition::Allow
    );
}
