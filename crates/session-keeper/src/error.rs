//! Session error types.

use crate::token::TokenError;
use auth_api_client::ApiError;
use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Stored or received token could not be decoded
    #[error("Invalid token: {0}")]
    Decode(#[from] TokenError),

    /// Another refresh is already outstanding
    #[error("A token refresh is already in progress")]
    RefreshConflict,

    /// Any HTTP non-2xx or transport failure from the API layer
    #[error(transparent)]
    Network(ApiError),

    /// Validation and refresh both failed
    #[error("Session expired")]
    SessionExpired,

    /// No username is known for an operation that needs one
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] credential_storage::StorageError),

    /// A required input was missing
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] client_config_and_utils::CoreError),
}

impl SessionError {
    /// Returns true if this error is transient (connection failures, timeouts, 5xx).
    ///
    /// Refresh is never retried; this is only used to pick a log level.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::Network(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true when the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Network(e) if e.is_unauthorized())
    }
}

impl From<ApiError> for SessionError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Validation(message) => SessionError::Validation(message),
            other => SessionError::Network(other),
        }
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_server_error() {
        let err = SessionError::Network(ApiError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert!(err.is_transient());
    }

    #[test]
    fn test_is_not_transient_conflict() {
        assert!(!SessionError::RefreshConflict.is_transient());
    }

    #[test]
    fn test_is_not_transient_session_expired() {
        assert!(!SessionError::SessionExpired.is_transient());
    }

    #[test]
    fn test_is_not_transient_decode() {
        assert!(!SessionError::Decode(TokenError::Malformed("x".to_string())).is_transient());
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = SessionError::Network(ApiError::Unauthorized("nope".to_string()));
        assert!(err.is_unauthorized());
        assert!(!SessionError::NotLoggedIn.is_unauthorized());
    }

    #[test]
    fn test_api_validation_maps_to_validation() {
        let err: SessionError = ApiError::Validation("Email is required".to_string()).into();
        assert!(matches!(err, SessionError::Validation(ref m) if m == "Email is required"));
    }

    #[test]
    fn test_network_error_is_transparent() {
        let err = SessionError::Network(ApiError::Status {
            status: 400,
            message: "Bad credentials".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 400: Bad credentials");
    }
}
