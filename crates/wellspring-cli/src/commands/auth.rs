//! Authentication commands.

use super::{open_session, required};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use auth_api_client::LoginRequest;
use client_config_and_utils::Paths;
use session_keeper::SessionStatus;
use std::time::Duration;

/// Login with email and password.
pub async fn login(paths: &Paths, email: Option<String>, format: &OutputFormat) -> Result<()> {
    let manager = open_session(paths).await?;

    if manager.is_logged_in() {
        let username = manager.username().unwrap_or_else(|| "unknown".to_string());
        output::print_success(&format!("Already logged in as {}", username), format);
        return Ok(());
    }

    let email = required(email, "Email")?;

    // Prompt for password (hidden)
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    if matches!(format, OutputFormat::Text) {
        println!("Logging in...");
    }

    let response = manager.login(LoginRequest { email, password }).await?;
    output::print_success(&format!("Logged in as {}", response.user.username), format);
    Ok(())
}

/// Logout and clear session.
pub async fn logout(paths: &Paths, format: &OutputFormat) -> Result<()> {
    let manager = open_session(paths).await?;

    match manager.logout().await {
        Ok(()) => output::print_success("Logged out successfully", format),
        Err(e) => output::print_success(
            &format!("Logged out locally (server said: {})", e),
            format,
        ),
    }
    Ok(())
}

/// Check authentication status.
pub async fn status(paths: &Paths, format: &OutputFormat) -> Result<()> {
    let manager = open_session(paths).await?;
    print_status(&manager.status(), format);
    Ok(())
}

pub(crate) fn print_status(status: &SessionStatus, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            output::print_heading("Session");
            output::print_row("State", &format!("{:?}", status.state));
            if status.is_logged_in {
                output::print_row("Auth", "logged in");
                output::print_row("User", status.username.as_deref().unwrap_or("unknown"));
            } else {
                output::print_row("Auth", "not logged in");
            }
            if let Some(secs) = status.expires_in_secs {
                output::print_row("Expires", &describe_in(secs));
            }
            if let Some(secs) = status.refresh_in_secs {
                output::print_row("Next refresh", &describe_in(secs));
            }
        }
        OutputFormat::Json => output::print_json(status),
    }
}

fn describe_in(secs: u64) -> String {
    let at = chrono::Local::now() + Duration::from_secs(secs);
    format!("{} (in {}s)", at.format("%Y-%m-%d %H:%M:%S"), secs)
}

/// Refresh the access token now.
pub async fn refresh(paths: &Paths, format: &OutputFormat) -> Result<()> {
    let manager = open_session(paths).await?;

    let response = manager.refresh_current().await?;
    output::print_success(
        &format!("Token refreshed for {}", response.user.username),
        format,
    );
    Ok(())
}

/// Show the current user's profile.
pub async fn me(paths: &Paths, format: &OutputFormat) -> Result<()> {
    let manager = open_session(paths).await?;
    manager.ensure_session().await?;

    let profile = manager.refetch_me().await?;
    match format {
        OutputFormat::Text => {
            output::print_heading("Profile");
            output::print_row("Username", profile.username().unwrap_or("unknown"));
            let email = profile
                .user_essentials
                .as_ref()
                .map(|u| u.email.as_str())
                .unwrap_or("");
            output::print_row("Email", email);
            let name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !name.is_empty() {
                output::print_row("Name", &name);
            }
            for (label, value) in [
                ("City", &profile.city),
                ("Country", &profile.country),
                ("Bio", &profile.bio),
            ] {
                if let Some(value) = value {
                    output::print_row(label, value);
                }
            }
        }
        OutputFormat::Json => output::print_json(&profile),
    }
    Ok(())
}

