//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Uninitialized  │ (initial)
//! └────────┬────────┘
//!          │ BeginCheck
//!          ▼
//! ┌─────────────────┐  NoToken   ┌─────────────────┐
//! │    Checking     │ ─────────► │ Unauthenticated │ ◄──── SessionCleared (any state)
//! └───┬─────────┬───┘            └────────┬────────┘
//!     │         │ TokenStale              │ LoginAttempt
//!     │         ▼                         ▼
//!     │   ┌─────────────┐          ┌─────────────────┐
//!     │   │ Refreshing  │          │    LoggingIn    │
//!     │   └──────┬──────┘          └────────┬────────┘
//!     │          │ RefreshSucceeded         │ LoginSucceeded
//!     │ TokenValid                          │
//!     ▼          ▼                          ▼
//! ┌──────────────────────────────────────────────────┐
//! │                  Authenticated                   │
//! └───────────┬──────────────────────────────────────┘
//!             │ LogoutRequested
//!             ▼
//! ┌─────────────────┐ LogoutComplete
//! │   LoggingOut    │ ──────────────► Unauthenticated
//! └─────────────────┘
//! ```
//!
//! `Authenticated` re-enters `Refreshing` on `RefreshStarted`; a failed
//! refresh falls back to `Unauthenticated`.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Uninitialized)

    Uninitialized => {
        BeginCheck => Checking,
        LoginAttempt => LoggingIn,
        SessionCleared => Unauthenticated
    },
    Checking => {
        NoToken => Unauthenticated,
        TokenValid => Authenticated,
        // Stored token is expired or undecodable
        TokenStale => Refreshing,
        SessionCleared => Unauthenticated
    },
    Unauthenticated => {
        BeginCheck => Checking,
        LoginAttempt => LoggingIn,
        // Cookie-backed refresh credential may still be valid server-side
        RefreshStarted => Refreshing,
        LogoutRequested => LoggingOut,
        SessionCleared => Unauthenticated
    },
    LoggingIn => {
        LoginSucceeded => Authenticated,
        LoginFailed => Unauthenticated,
        SessionCleared => Unauthenticated
    },
    Authenticated => {
        RefreshStarted => Refreshing,
        LoginAttempt => LoggingIn,
        LogoutRequested => LoggingOut,
        SessionCleared => Unauthenticated
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshFailed => Unauthenticated,
        // Logout wins over an outstanding refresh; its result is discarded
        LogoutRequested => LoggingOut,
        SessionCleared => Unauthenticated
    },
    LoggingOut => {
        LogoutComplete => Unauthenticated,
        SessionCleared => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Public view of the session FSM state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Stored credentials have not been checked yet.
    Uninitialized,
    /// Reading the stored token.
    Checking,
    /// No usable session.
    Unauthenticated,
    /// Login request outstanding.
    LoggingIn,
    /// Holding a token believed valid.
    Authenticated,
    /// Refresh request outstanding.
    Refreshing,
    /// Logout request outstanding.
    LoggingOut,
}

impl SessionState {
    /// Returns true only in `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// States in which a previously written token is still in use.
    pub fn holds_session(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated | SessionState::Refreshing | SessionState::LoggingOut
        )
    }

    /// Returns true if a request is outstanding or the check has not finished.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Checking
                | SessionState::LoggingIn
                | SessionState::Refreshing
                | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Uninitialized => SessionState::Uninitialized,
            SessionMachineState::Checking => SessionState::Checking,
            SessionMachineState::Unauthenticated => SessionState::Unauthenticated,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

/// Payload for session state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChangedPayload {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
