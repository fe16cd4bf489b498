//! I. Refresh timer placement and replacement.

use super::harness::{TestHarness, TokenReply};
use crate::{ScheduleOutcome, SessionError, SessionState};
use std::time::Duration;

// =============================================================================
// Placement
// =============================================================================

/// A token with at least buffer + min interval left is armed at V - 120.
#[tokio::test(start_paused = true)]
async fn long_lived_token_is_armed_before_expiry() {
    let h = TestHarness::unauthenticated().await;

    for lifetime in [150, 300, 3_600] {
        let token = h.token("ana", lifetime);
        let outcome = h.manager.schedule_refresh(&token).unwrap();

        let expected = Duration::from_secs((lifetime - 120) as u64);
        assert_eq!(outcome, ScheduleOutcome::Armed(expected));
        assert_eq!(h.manager.armed_refresh_in(), Some(expected));
    }
    assert_eq!(h.api.refreshes(), 0);
}

/// A token inside the buffer is refreshed at once and no timer is left armed.
#[tokio::test(start_paused = true)]
async fn short_lived_token_refreshes_immediately() {
    let h = TestHarness::unauthenticated().await;
    let token = h.store_token("ana", 100);

    let outcome = h.manager.schedule_refresh(&token).unwrap();
    assert_eq!(outcome, ScheduleOutcome::RefreshingNow);
    assert!(!h.manager.has_armed_timer());

    h.settle().await;
    assert_eq!(h.api.refreshes(), 1);
    assert_eq!(h.api.refresh_usernames(), vec!["ana".to_string()]);
    assert_eq!(h.manager.state(), SessionState::Authenticated);

    // The fresh 600s token is armed for its own renewal.
    assert_eq!(
        h.manager.armed_refresh_in(),
        Some(Duration::from_secs(480))
    );
}

/// Undecodable tokens are rejected without touching the timer slot.
#[tokio::test(start_paused = true)]
async fn undecodable_token_is_not_scheduled() {
    let h = TestHarness::unauthenticated().await;

    assert!(matches!(
        h.manager.schedule_refresh("garbage"),
        Err(SessionError::Decode(_))
    ));
    assert!(!h.manager.has_armed_timer());
    assert_eq!(h.api.refreshes(), 0);
}

// =============================================================================
// Replacement
// =============================================================================

/// Scheduling repeatedly leaves exactly one timer, which fires once.
#[tokio::test(start_paused = true)]
async fn repeated_scheduling_keeps_one_timer() {
    let h = TestHarness::authenticated(300).await;
    let token = h.tokens.read().unwrap().unwrap();

    for _ in 0..10 {
        h.manager.schedule_refresh(&token).unwrap();
    }
    assert!(h.manager.has_armed_timer());

    tokio::time::sleep(Duration::from_secs(181)).await;
    h.settle().await;
    assert_eq!(h.api.refreshes(), 1);
}

/// The armed timer fires at V - 120, refreshes and re-arms for the new token.
#[tokio::test(start_paused = true)]
async fn timer_fires_and_rearms() {
    let h = TestHarness::authenticated(300).await;
    assert_eq!(
        h.manager.armed_refresh_in(),
        Some(Duration::from_secs(180))
    );

    tokio::time::sleep(Duration::from_secs(179)).await;
    assert_eq!(h.api.refreshes(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    h.settle().await;
    assert_eq!(h.api.refreshes(), 1);
    assert!(h.manager.is_logged_in());
    assert_eq!(h.cookie().unwrap().max_age_secs, 600);
    // Re-armed at t=180 for 480s; one second has passed since.
    assert_eq!(
        h.manager.armed_refresh_in(),
        Some(Duration::from_secs(479))
    );
}

/// A refresh that returns a token still inside the buffer waits the minimum
/// interval instead of refreshing again at once.
#[tokio::test(start_paused = true)]
async fn short_refreshed_token_waits_min_interval() {
    let h = TestHarness::authenticated(300).await;
    h.api.queue_refresh(TokenReply::Issue { lifetime_secs: 60 });

    tokio::time::sleep(Duration::from_secs(181)).await;
    h.settle().await;

    assert_eq!(h.api.refreshes(), 1);
    assert_eq!(h.manager.armed_refresh_in(), Some(Duration::from_secs(29)));
}

/// A failed scheduled refresh clears the session and is not retried.
#[tokio::test(start_paused = true)]
async fn failed_scheduled_refresh_clears_without_retry() {
    let h = TestHarness::authenticated(300).await;
    h.api.set_default_refresh(TokenReply::Fail(500));

    tokio::time::sleep(Duration::from_secs(181)).await;
    h.settle().await;

    assert_eq!(h.api.refreshes(), 1);
    assert!(h.cookie().is_none());
    assert!(!h.manager.is_logged_in());
    assert!(!h.manager.has_armed_timer());
    assert_eq!(h.manager.state(), SessionState::Unauthenticated);

    tokio::time::sleep(Duration::from_secs(3_600)).await;
    assert_eq!(h.api.refreshes(), 1);
}

/// Clearing right after an immediate refresh was started stops it.
#[tokio::test(start_paused = true)]
async fn clear_stops_pending_immediate_refresh() {
    let h = TestHarness::authenticated(600).await;
    let token = h.token("ana", 60);

    assert_eq!(
        h.manager.schedule_refresh(&token).unwrap(),
        ScheduleOutcome::RefreshingNow
    );
    h.manager.clear();
    h.settle().await;

    assert_eq!(h.api.refreshes(), 0);
    assert_eq!(h.manager.state(), SessionState::Unauthenticated);
    assert!(!h.manager.is_logged_in());
    assert!(h.cookie().is_none());
    assert!(h.durable_username().is_none());
}

/// A logout issued before the immediate refresh runs is not undone by it.
#[tokio::test(start_paused = true)]
async fn logout_stops_pending_immediate_refresh() {
    let h = TestHarness::authenticated(600).await;
    let token = h.token("ana", 60);

    h.manager.schedule_refresh(&token).unwrap();
    h.manager.logout().await.unwrap();
    h.settle().await;

    assert_eq!(h.api.refreshes(), 0);
    assert!(!h.manager.is_logged_in());
    assert!(h.cookie().is_none());
}

/// Rescheduling a short token repeatedly still refreshes only once.
#[tokio::test(start_paused = true)]
async fn repeated_immediate_scheduling_refreshes_once() {
    let h = TestHarness::authenticated(600).await;
    let token = h.token("ana", 60);

    for _ in 0..5 {
        h.manager.schedule_refresh(&token).unwrap();
    }
    h.settle().await;

    assert_eq!(h.api.refreshes(), 1);
    assert!(h.manager.is_logged_in());
}

/// Cancelling disarms the timer.
#[tokio::test(start_paused = true)]
async fn cancel_disarms_timer() {
    let h = TestHarness::authenticated(300).await;

    assert!(h.manager.cancel_scheduled_refresh());
    assert!(!h.manager.has_armed_timer());

    tokio::time::sleep(Duration::from_secs(400)).await;
    assert_eq!(h.api.refreshes(), 0);
}
