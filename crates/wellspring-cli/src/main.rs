//! Wellspring CLI - sign in to Wellspring and keep the session alive.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use client_config_and_utils::{init_logging, Config, Paths};
use tracing::debug;

/// Wellspring CLI - Manage your Wellspring account session.
#[derive(Parser)]
#[command(name = "wellspring")]
#[command(about = "Wellspring CLI for authentication and session management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        /// Account email (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Refresh the access token now
    Refresh,

    /// Show the signed-in user's profile
    Me,

    /// Create an account
    Register {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Send the email verification link again
    SendVerification {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Verify an email address with the emailed token
    VerifyEmail {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Request a password reset link
    ForgotPassword {
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Set a new password with the emailed reset token
    ResetPassword {
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Keep the session refreshed until interrupted
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let paths = match Paths::new() {
        Ok(paths) => paths,
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    };

    // Log to file only; the terminal belongs to command output.
    let log_path = paths.ensure_dirs().ok().map(|_| paths.log_file());
    let log_level = match cli.log_level.clone() {
        Some(level) => level,
        None => Config::load(&paths)
            .map(|config| config.log_level)
            .unwrap_or_else(|_| "warn".to_string()),
    };
    init_logging(&log_level, log_path, false);
    debug!(base_dir = %paths.base_dir().display(), "CLI starting");

    let format = &cli.format;
    let result = match cli.command {
        Commands::Login { email } => commands::login(&paths, email, format).await,
        Commands::Logout => commands::logout(&paths, format).await,
        Commands::Status => commands::status(&paths, format).await,
        Commands::Refresh => commands::refresh(&paths, format).await,
        Commands::Me => commands::me(&paths, format).await,
        Commands::Register { username, email } => {
            commands::register(&paths, username, email, format).await
        }
        Commands::SendVerification { email } => {
            commands::send_verification(&paths, email, format).await
        }
        Commands::VerifyEmail { email, token } => {
            commands::verify_email(&paths, email, token, format).await
        }
        Commands::ForgotPassword { email } => {
            commands::forgot_password(&paths, email, format).await
        }
        Commands::ResetPassword { email, token } => {
            commands::reset_password(&paths, email, token, format).await
        }
        Commands::Watch => commands::watch(&paths, format).await,
    };

    if let Err(e) = result {
        output::print_error(&e.to_string(), format);
        std::process::exit(1);
    }
}
