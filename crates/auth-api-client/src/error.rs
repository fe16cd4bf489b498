//! API error types.

use thiserror::Error;

/// Error returned by any REST call.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (connect, timeout, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered 401; the stored token has already been deleted
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other non-2xx status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),

    /// A required request field was missing
    #[error("{0}")]
    Validation(String),

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns true for connection failures, timeouts and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            ApiError::Status { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_reports_401() {
        let err = ApiError::Unauthorized("expired".to_string());
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_server_errors_are_transient() {
        let err = ApiError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let err = ApiError::Status {
            status: 400,
            message: "bad".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!ApiError::Validation("email is required".to_string()).is_transient());
    }

    #[test]
    fn test_status_message_display() {
        let err = ApiError::Status {
            status: 409,
            message: "Username taken".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 409: Username taken");
    }
}
