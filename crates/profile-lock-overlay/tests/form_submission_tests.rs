mod common;

use common::{ScriptedClient, controller, guarding_controller};
use profile_lock_overlay::{
    GuardPhase, MSG_ENTER_PASSWORD, MSG_SERVICE_UNREACHABLE, SubmitOutcome, TimerKind,
};

#[test]
fn form_empty_submission_never_contacts_service() {
    let (mut controller, client) = guarding_controller("hunter2");
    let before = client.requests();

    assert_eq!(controller.submit_password(""), SubmitOutcome::EmptyPassword);
    assert_eq!(client.requests(), before);
    assert_eq!(controller.host().form_message(), Some(MSG_ENTER_PASSWORD));
    assert!(controller.is_guarding());
}

#[test]
fn form_wrong_password_shows_error_clears_and_refocuses() {
    let (mut controller, _client) = guarding_controller("hunter2");
    controller.host_mut().type_password("nope");
    let focused = controller.host().focus_count();

    let outcome = controller.submit_typed();

    assert_eq!(
        outcome,
        SubmitOutcome::Rejected("Incorrect password".to_string())
    );
    let surface = controller.host();
    assert_eq!(surface.form_message(), Some("Incorrect password"));
    assert_eq!(surface.password_input(), "");
    assert_eq!(surface.focus_count(), focused + 1);
    assert!(controller.is_guarding());
}

#[test]
fn form_correct_password_tears_down_guard() {
    let (mut controller, _client) = guarding_controller("hunter2");
    controller.host_mut().type_password("hunter2");

    assert_eq!(controller.submit_typed(), SubmitOutcome::Unlocked);
    assert_eq!(controller.phase(), GuardPhase::Idle);
    assert!(!controller.locked_view());
    assert!(controller.host().active_timers().is_empty());
    assert_eq!(controller.host().overlay_count(), 0);
}

#[test]
fn form_unreachable_service_schedules_retry() {
    let (mut controller, client) = guarding_controller("hunter2");
    client.set_unavailable(true);

    assert_eq!(
        controller.submit_password("hunter2"),
        SubmitOutcome::Unreachable
    );
    assert_eq!(
        controller.host().form_message(),
        Some(MSG_SERVICE_UNREACHABLE)
    );
    assert!(controller.retry_pending());
    assert!(controller.is_guarding());
    assert!(controller.host().active_timers().contains(&TimerKind::Retry));
}

#[test]
fn form_submission_outside_guard_is_ignored() {
    let client = ScriptedClient::unconfigured();
    let mut controller = controller(client.clone());
    controller.activate();

    assert_eq!(
        controller.submit_password("anything"),
        SubmitOutcome::NotGuarding
    );
    assert_eq!(client.requests(), 1);
}

#[test]
fn form_retry_reaches_service_once_it_returns() {
    let client = ScriptedClient::locked("hunter2");
    client.set_unavailable(true);
    let mut controller = controller(client.clone());

    controller.activate();
    assert_eq!(controller.phase(), GuardPhase::Idle);
    assert!(controller.retry_pending());

    client.set_unavailable(false);
    controller.advance_clock(1_000);

    assert!(!controller.retry_pending());
    assert!(controller.is_guarding());
    assert_eq!(controller.host().overlay_count(), 1);
}
