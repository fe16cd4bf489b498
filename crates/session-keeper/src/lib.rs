//! Client-side session keeping for Wellspring.
//!
//! This crate provides:
//! - JWT expiry and subject helpers (no signature verification)
//! - The access-token cookie store
//! - A refresh scheduler that renews the token before it expires
//! - Single-flight token refresh
//! - Bootstrap and focus reconciliation over an explicit FSM
//! - The public auth operations (login, logout, register, verification, password reset)

mod clock;
mod error;
mod manager;
mod runtime;
mod scheduler;
mod session_fsm;
mod token;
mod token_store;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, SessionResult};
pub use manager::{
    FocusOutcome, ScheduleOutcome, SessionManager, SessionStateCallback, SessionStatus,
};
pub use runtime::ClientRuntime;
pub use scheduler::{RefreshPolicy, SchedulePlan};
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionState,
    SessionStateChangedPayload,
};
pub use token::{get_subject, is_token_valid, seconds_until_expire, TokenError, TokenResult};
pub use token_store::TokenStore;
