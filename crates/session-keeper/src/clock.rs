//! Wall-clock source for token expiry math.

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that follows tokio's (possibly paused) time from a fixed epoch.
///
/// With `start_paused` tests, sleeping or `tokio::time::advance` moves this
/// clock too. [`ManualClock::jump`] moves only the wall clock, the way a
/// machine waking from sleep sees time pass without timers having fired.
#[derive(Debug)]
pub struct ManualClock {
    epoch: i64,
    started: tokio::time::Instant,
    offset: AtomicI64,
}

impl ManualClock {
    pub fn new(epoch: i64) -> Self {
        Self {
            epoch,
            started: tokio::time::Instant::now(),
            offset: AtomicI64::new(0),
        }
    }

    /// Move wall time forward (or back, with a negative value) without
    /// advancing tokio time.
    pub fn jump(&self, secs: i64) {
        self.offset.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        let elapsed = i64::try_from(self.started.elapsed().as_secs()).unwrap_or(i64::MAX);
        self.epoch
            .saturating_add(elapsed)
            .saturating_add(self.offset.load(Ordering::SeqCst))
    }
}
