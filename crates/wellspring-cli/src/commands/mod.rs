//! CLI command implementations.

mod account;
mod auth;
mod watch;

pub use account::{forgot_password, register, reset_password, send_verification, verify_email};
pub use auth::{login, logout, me, refresh, status};
pub use watch::watch;

use anyhow::{bail, Result};
use client_config_and_utils::Paths;
use session_keeper::{ClientRuntime, SessionManager};
use std::io::{self, Write};

/// Build the runtime and reconcile with stored credentials.
async fn open_session(paths: &Paths) -> Result<SessionManager> {
    let runtime = ClientRuntime::from_paths(paths.clone())?;
    let manager = runtime.manager().clone();
    manager.bootstrap().await;
    Ok(manager)
}

/// Read one trimmed line from stdin after printing `label`.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Use `value` if given, otherwise prompt for it.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Like [`value_or_prompt`], but the answer must not be empty.
fn required(value: Option<String>, label: &str) -> Result<String> {
    let value = value_or_prompt(value, label)?;
    if value.is_empty() {
        bail!("{} is required", label);
    }
    Ok(value)
}
