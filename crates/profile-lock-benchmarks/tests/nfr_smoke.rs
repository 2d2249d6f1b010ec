//! Benchmark smoke test for digest verification and guard reassertion.

use std::sync::Arc;
use std::time::Instant;

use profile_lock_auth::{hash_password, verify_password};
use profile_lock_core::{ActionOutcome, LockRequest, LockResponse, LockSnapshot};
use profile_lock_overlay::{
    GuardConfig, LockClient, OverlayController, SyntheticSurface, TransportError,
};

struct AlwaysLocked;

impl LockClient for AlwaysLocked {
    fn request(&self, request: &LockRequest) -> Result<LockResponse, TransportError> {
        Ok(match request {
            LockRequest::GetLockState => LockResponse::State(LockSnapshot {
                is_locked: true,
                has_password: true,
            }),
            _ => LockResponse::Outcome(ActionOutcome::failed("Incorrect password")),
        })
    }
}

#[test]
fn benchmark_digest_smoke_prints_latency() {
    let stored = hash_password("correct horse battery staple");

    let start = Instant::now();
    let mut matches = 0usize;
    for index in 0..10_000_u32 {
        let candidate = format!("guess-{index}");
        if verify_password(&candidate, Some(&stored)) {
            matches += 1;
        }
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_digest_elapsed_ms={elapsed_ms}");

    assert_eq!(matches, 0);
    // This is a lightweight guardrail; strict NFR checks are environment-specific.
    assert!(elapsed_ms < 5_000, "digest smoke benchmark should stay bounded");
}

#[test]
fn benchmark_guard_ticks_under_tamper_prints_latency() {
    let mut controller = OverlayController::new(
        SyntheticSurface::new(),
        Arc::new(AlwaysLocked),
        GuardConfig::default(),
    )
    .expect("default timings are valid");
    controller.activate();

    let start = Instant::now();
    for round in 0..5_000 {
        controller.host_mut().remove_overlay_externally();
        controller.host_mut().remove_blur_externally();
        if round % 50 == 0 {
            controller.host_mut().prepend_content("injected");
        }
        controller.advance_clock(300);
        assert!(controller.overlay_state().overlay_present);
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_guard_ticks_elapsed_ms={elapsed_ms}");
    println!(
        "benchmark_guard_virtual_ms={}",
        controller.host().now_ms()
    );

    assert_eq!(controller.host().overlay_count(), 1);
    assert!(elapsed_ms < 5_000, "guard tick smoke benchmark should stay bounded");
}
