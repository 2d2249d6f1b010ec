use profile_lock_core::{ActionOutcome, LockRequest, LockSnapshot};
use profile_lock_ui::{
    CHANGE_SUCCESS_REFRESH_MS, ChangeForm, FormKind, MSG_PASSWORD_CHANGED, NextStep, PopupSection,
    PopupState, RemoveForm, SetupForm, StatusTone, UnlockForm, ValidationError,
};

fn unlocked() -> LockSnapshot {
    LockSnapshot {
        is_locked: false,
        has_password: true,
    }
}

#[test]
fn settings_projection_covers_every_state() {
    let setup = PopupState::from_snapshot(
        "0.1.0",
        LockSnapshot {
            is_locked: false,
            has_password: false,
        },
    );
    assert_eq!(setup.section, PopupSection::Setup);
    assert_eq!(setup.tone, StatusTone::Unlocked);

    let locked = PopupState::from_snapshot(
        "0.1.0",
        LockSnapshot {
            is_locked: true,
            has_password: true,
        },
    );
    assert_eq!(locked.section, PopupSection::Locked);
    assert_eq!(locked.tone, StatusTone::Locked);
    assert_eq!(locked.status_text, "Profile is locked");

    let open = PopupState::from_snapshot("0.1.0", unlocked());
    assert_eq!(open.section, PopupSection::Unlocked);
    assert_eq!(open.status_text, "Profile is unlocked");
}

#[test]
fn settings_setup_form_builds_set_password() {
    let form = SetupForm {
        password: "hunter2".to_string(),
        confirm: "hunter2".to_string(),
        auto_lock: false,
    };
    assert_eq!(
        form.to_request(),
        Ok(LockRequest::SetPassword {
            password: "hunter2".to_string(),
            auto_lock_enabled: Some(false),
        })
    );
}

#[test]
fn settings_setup_form_rejections_use_popup_messages() {
    let mut form = SetupForm {
        password: String::new(),
        confirm: String::new(),
        auto_lock: true,
    };
    assert_eq!(form.to_request(), Err(ValidationError::MissingPassword));

    form.password = "abcd".to_string();
    form.confirm = "abce".to_string();
    let error = form.to_request().expect_err("mismatch must fail");
    assert_eq!(error.to_string(), "Passwords do not match");
}

#[test]
fn settings_length_counts_characters_not_bytes() {
    let form = SetupForm {
        password: "éééé".to_string(),
        confirm: "éééé".to_string(),
        auto_lock: true,
    };
    assert!(form.to_request().is_ok());
}

#[test]
fn settings_change_form_checks() {
    let mut form = ChangeForm {
        current: "hunter2".to_string(),
        new_password: String::new(),
        confirm: String::new(),
    };
    assert_eq!(form.to_request(), Err(ValidationError::MissingFields));

    form.new_password = "abc".to_string();
    assert_eq!(form.to_request(), Err(ValidationError::NewPasswordTooShort));

    form.new_password = "correct horse".to_string();
    form.confirm = "correct hose".to_string();
    assert_eq!(form.to_request(), Err(ValidationError::NewPasswordMismatch));

    form.confirm = "correct horse".to_string();
    assert_eq!(
        form.to_request(),
        Ok(LockRequest::ChangePassword {
            current_password: "hunter2".to_string(),
            new_password: "correct horse".to_string(),
        })
    );
}

#[test]
fn settings_unlock_and_remove_require_input() {
    let unlock = UnlockForm {
        password: String::new(),
    };
    let remove = RemoveForm {
        password: String::new(),
    };
    assert_eq!(
        unlock.to_request(),
        Err(ValidationError::MissingCurrentPassword)
    );
    assert_eq!(
        remove.to_request().map_err(|e| e.to_string()),
        Err("Please enter your password".to_string())
    );
}

#[test]
fn settings_change_and_remove_open_only_when_unlocked() {
    let mut locked = PopupState::from_snapshot(
        "0.1.0",
        LockSnapshot {
            is_locked: true,
            has_password: true,
        },
    );
    assert!(!locked.open_change_password());
    assert_eq!(locked.section, PopupSection::Locked);

    let mut state = PopupState::from_snapshot("0.1.0", unlocked());
    assert!(state.open_remove_password());
    assert_eq!(state.section, PopupSection::RemovePassword);

    state.refresh(unlocked());
    assert_eq!(state.section, PopupSection::Unlocked);
}

#[test]
fn settings_outcomes_map_to_messages_and_refresh() {
    let mut state = PopupState::from_snapshot("0.1.0", unlocked());
    state.open_change_password();

    let next = state.apply_outcome(FormKind::Change, &ActionOutcome::ok());
    assert_eq!(next, NextStep::RefreshAfter(CHANGE_SUCCESS_REFRESH_MS));
    let message = state.message.clone().expect("success message");
    assert_eq!(message.text, MSG_PASSWORD_CHANGED);
    assert!(!message.is_error);

    let next = state.apply_outcome(
        FormKind::Change,
        &ActionOutcome::failed("Current password is incorrect"),
    );
    assert_eq!(next, NextStep::Stay);
    assert_eq!(
        state.message.as_ref().map(|m| m.text.as_str()),
        Some("Current password is incorrect")
    );

    let fallback = ActionOutcome {
        success: false,
        error: None,
    };
    state.apply_outcome(FormKind::Setup, &fallback);
    assert_eq!(
        state.message.as_ref().map(|m| m.text.as_str()),
        Some("Failed to set password")
    );

    assert_eq!(
        state.apply_outcome(FormKind::Unlock, &ActionOutcome::ok()),
        NextStep::Refresh
    );
}
