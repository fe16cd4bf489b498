//! Keep the session alive in the foreground.
//!
//! Each line read from stdin counts as a focus event, so a wrapper script (or
//! a person pressing Enter after resuming a laptop) can trigger the catch-up
//! check. Exits on Ctrl-C.

use super::auth::print_status;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use client_config_and_utils::Paths;
use session_keeper::{ClientRuntime, SessionStateChangedPayload};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub async fn watch(paths: &Paths, format: &OutputFormat) -> Result<()> {
    let runtime = ClientRuntime::from_paths(paths.clone())?;
    let manager = runtime.manager().clone();

    let callback_format = *format;
    manager.set_state_callback(Box::new(move |payload: SessionStateChangedPayload| {
        match callback_format {
            OutputFormat::Text => {
                let user = payload
                    .username
                    .as_deref()
                    .map(|u| format!(" ({})", u))
                    .unwrap_or_default();
                println!("state: {:?}{}", payload.state, user);
            }
            OutputFormat::Json => output::print_json(&payload),
        }
    }));

    let status = manager.bootstrap().await;
    print_status(&status, format);

    let (tx, rx) = mpsc::channel(8);
    let listener = manager.spawn_focus_listener(rx);

    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            debug!("Focus event from stdin");
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });

    if matches!(format, OutputFormat::Text) {
        println!("Watching session. Press Enter to re-check, Ctrl-C to exit.");
    }

    tokio::signal::ctrl_c().await?;
    info!("Watch interrupted");

    stdin_task.abort();
    listener.abort();
    manager.cancel_scheduled_refresh();

    print_status(&manager.status(), format);
    Ok(())
}
