#![warn(missing_docs)]
//! # profile-lock binary
//!
//! Command-line front end over a JSON file store. Every command prints the
//! wire-format JSON the service would send to a rendering context.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use profile_lock_app::{AppConfig, AppError, ControlHub, app_version, init_tracing};
use profile_lock_core::{IdleState, LifecycleEvent, LockRequest, LockResponse};
use profile_lock_store::JsonFileStore;
use profile_lock_ui::{ChangeForm, PopupState, RemoveForm, SetupForm, UnlockForm};
use tracing::debug;

/// Profile lock control process.
#[derive(Parser)]
#[command(name = "profile-lock")]
#[command(about = "Password gate for a browsing profile")]
#[command(version = app_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Credential store file (overrides PROFILE_LOCK_STORE_PATH)
    #[arg(long)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print `{isLocked, hasPassword}`
    State,

    /// Print the settings surface status line
    Status,

    /// Unlock with the current password
    Unlock {
        /// Current password
        #[arg(long)]
        password: String,
    },

    /// Lock the profile
    Lock,

    /// Configure the first password
    SetPassword {
        /// New password (at least 4 characters)
        #[arg(long)]
        password: String,

        /// Disable locking on system idle
        #[arg(long)]
        no_auto_lock: bool,
    },

    /// Replace the password
    ChangePassword {
        /// Current password
        #[arg(long)]
        current: String,

        /// New password (at least 4 characters)
        #[arg(long)]
        new: String,
    },

    /// Remove the password and all lock settings
    RemovePassword {
        /// Current password
        #[arg(long)]
        password: String,
    },

    /// Send one raw JSON request, e.g. '{"action":"getLockState"}'
    Request {
        /// Request body
        json: String,
    },

    /// Deliver the control-process startup event
    Startup,

    /// Deliver the install/update event
    Installed,

    /// Deliver an idle-state change (active, idle, locked)
    Idle {
        /// New idle state
        state: IdleState,
    },
}

/// CLI entry point.
fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(error) => {
            eprintln!("profile-lock: {error}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the service answered with `success: false`.
fn run(cli: Cli) -> Result<bool, AppError> {
    let mut config = AppConfig::from_env();
    if let Some(path) = cli.store {
        config.store_path = path;
    }
    debug!(store = %config.store_path.display(), "opening credential store");

    let backend = Arc::new(JsonFileStore::new(config.store_path.clone()));
    let hub = ControlHub::new(backend, &config)?;

    let request = match cli.command {
        Commands::State => LockRequest::GetLockState,
        Commands::Status => {
            let popup = PopupState::from_snapshot(app_version(), hub.snapshot()?);
            println!("{} ({:?})", popup.status_text, popup.section);
            return Ok(true);
        }
        Commands::Unlock { password } => UnlockForm { password }.to_request()?,
        Commands::Lock => LockRequest::Lock,
        Commands::SetPassword {
            password,
            no_auto_lock,
        } => SetupForm {
            confirm: password.clone(),
            password,
            auto_lock: !no_auto_lock,
        }
        .to_request()?,
        Commands::ChangePassword { current, new } => ChangeForm {
            current,
            confirm: new.clone(),
            new_password: new,
        }
        .to_request()?,
        Commands::RemovePassword { password } => RemoveForm { password }.to_request()?,
        Commands::Request { json } => LockRequest::from_json_bytes(json.as_bytes())?,
        Commands::Startup => return lifecycle(&hub, LifecycleEvent::Startup),
        Commands::Installed => return lifecycle(&hub, LifecycleEvent::Installed),
        Commands::Idle { state } => {
            return lifecycle(&hub, LifecycleEvent::IdleStateChanged(state));
        }
    };

    let response = hub.dispatch(&request)?;
    print_response(&response)?;
    Ok(!response.is_rejection())
}

fn lifecycle(hub: &ControlHub, event: LifecycleEvent) -> Result<bool, AppError> {
    hub.lifecycle(event)?;
    print_response(&LockResponse::State(hub.snapshot()?))?;
    Ok(true)
}

fn print_response(response: &LockResponse) -> Result<(), AppError> {
    let encoded = response.to_json_bytes()?;
    println!("{}", String::from_utf8_lossy(&encoded));
    Ok(())
}
