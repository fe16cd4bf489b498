//! Account commands: registration, email verification and password reset.
//!
//! None of these touch the stored session.

use super::{open_session, required};
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use auth_api_client::{RegisterRequest, ResetPasswordRequest, VerifyEmailRequest};
use client_config_and_utils::Paths;

/// Create an account.
pub async fn register(
    paths: &Paths,
    username: Option<String>,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let manager = open_session(paths).await?;

    let username = required(username, "Username")?;
    let email = required(email, "Email")?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm_password = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm_password {
        bail!("Passwords do not match");
    }

    let response = manager
        .register(RegisterRequest {
            username,
            email,
            password,
            confirm_password,
        })
        .await?;

    output::print_success(
        &format!(
            "Registered {} <{}>. Check your inbox to verify the address.",
            response.username, response.email
        ),
        format,
    );
    Ok(())
}

/// Ask the server to (re)send the verification email.
pub async fn send_verification(
    paths: &Paths,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let manager = open_session(paths).await?;
    let email = required(email, "Email")?;

    let response = manager.send_verification(&email).await?;
    output::print_success(&response.message, format);
    Ok(())
}

/// Confirm an email address with the emailed token.
pub async fn verify_email(
    paths: &Paths,
    email: Option<String>,
    token: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let manager = open_session(paths).await?;
    let email = required(email, "Email")?;
    let token = required(token, "Token")?;

    let response = manager
        .verify_email(VerifyEmailRequest { email, token })
        .await?;
    output::print_success(
        &format!("Email verified for {}", response.user.username),
        format,
    );
    Ok(())
}

/// Request a password reset link.
pub async fn forgot_password(
    paths: &Paths,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let manager = open_session(paths).await?;
    let email = required(email, "Email")?;

    let response = manager.forgot_password(&email).await?;
    output::print_success(&response.message, format);
    Ok(())
}

/// Set a new password with the emailed reset token.
pub async fn reset_password(
    paths: &Paths,
    email: Option<String>,
    token: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let manager = open_session(paths).await?;
    let email = required(email, "Email")?;
    let token = required(token, "Token")?;

    let new_password = rpassword::prompt_password("New password: ")?;
    if new_password.is_empty() {
        bail!("New password is required");
    }

    let response = manager
        .reset_password(ResetPasswordRequest {
            email,
            token,
            new_password,
        })
        .await?;
    output::print_success(
        &format!("Password reset for {}", response.user.username),
        format,
    );
    Ok(())
}
