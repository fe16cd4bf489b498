//! Logging initialization for the session client.
//!
//! Thin wrapper over the `observability` crate so binaries share one setup:
//! structured JSONL to `~/.wellspring/logs/client.jsonl`, level taken from
//! `RUST_LOG` or the provided default.

use observability::LogConfig;
use std::path::PathBuf;

const DEFAULT_SERVICE_NAME: &str = "wellspring";

/// Initialize logging for the default service name.
///
/// ```ignore
/// init_logging("info", None, false);
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, log_path: Option<PathBuf>, also_stderr: bool) {
    init_logging_for_service(DEFAULT_SERVICE_NAME, level, log_path, also_stderr);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(
    service_name: &str,
    level: &str,
    log_path: Option<PathBuf>,
    also_stderr: bool,
) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path,
        also_stderr,
    });
}

/// Parse a level from config, env or `--log-level`. Unknown values fall back to info.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_parse_level_from_user_input() {
        let cases = [
            ("warn", Level::WARN),
            (" Debug\n", Level::DEBUG),
            ("WARNING", Level::WARN),
            ("error", Level::ERROR),
            ("trace", Level::TRACE),
            ("info", Level::INFO),
            ("", Level::INFO),
            ("loud", Level::INFO),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_level(input), expected, "input {:?}", input);
        }
    }
}
