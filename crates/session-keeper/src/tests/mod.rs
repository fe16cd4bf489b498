//! Scenario tests for the session manager.
//!
//! All scenarios run on paused tokio time against a scripted API:
//!
//! - `harness.rs`      - Fake auth API and a manager wired to in-memory storage
//! - `scheduling.rs`   - I. Refresh timer placement and replacement
//! - `refresh.rs`      - II. Single-flight refresh and late results
//! - `bootstrap.rs`    - III. Startup reconciliation
//! - `focus.rs`        - IV. Focus checks after suspension
//! - `unauthorized.rs` - V. Reaction to 401 responses
//! - `login_logout.rs` - VI. Login, logout and clearing

mod scheduling;

#[allow(unused_imports)]
pub use harness::{FakeAuthApi, MeReply, TestHarness, TokenReply};
