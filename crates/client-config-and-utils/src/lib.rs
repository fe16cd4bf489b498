//! Configuration, paths, errors and logging for the Wellspring session client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_CRITICAL_TIME_THRESHOLD_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_MIN_REFRESH_INTERVAL_SECS, DEFAULT_REFRESH_BUFFER_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TOKEN_COOKIE_NAME,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service, parse_level};
pub use paths::Paths;
