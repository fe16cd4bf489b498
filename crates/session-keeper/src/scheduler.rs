//! Refresh scheduling: when to renew, and the single armed timer.

use client_config_and_utils::{
    Config, DEFAULT_CRITICAL_TIME_THRESHOLD_SECS, DEFAULT_MIN_REFRESH_INTERVAL_SECS,
    DEFAULT_REFRESH_BUFFER_SECS,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Timing constants for token renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Renew this long before expiry.
    pub buffer_secs: u64,
    /// Never arm a timer shorter than this.
    pub min_interval_secs: u64,
    /// On focus, renew proactively below this much remaining life.
    pub critical_threshold_secs: u64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            min_interval_secs: DEFAULT_MIN_REFRESH_INTERVAL_SECS,
            critical_threshold_secs: DEFAULT_CRITICAL_TIME_THRESHOLD_SECS,
        }
    }
}

impl From<&Config> for RefreshPolicy {
    fn from(config: &Config) -> Self {
        Self {
            buffer_secs: config.refresh_buffer_secs,
            min_interval_secs: config.min_refresh_interval_secs,
            critical_threshold_secs: config.critical_time_threshold_secs,
        }
    }
}

/// What to do with a token that has `time_available` seconds left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePlan {
    /// Waiting even the minimum interval would outlive the token.
    RefreshNow,
    RefreshIn(Duration),
}

impl RefreshPolicy {
    /// Plan the next refresh for a token with `time_available` seconds of life.
    pub fn plan(&self, time_available: u64) -> SchedulePlan {
        let time_until_refresh = time_available.saturating_sub(self.buffer_secs);
        let schedule_in = time_until_refresh.max(self.min_interval_secs);

        if schedule_in <= self.min_interval_secs && time_available < self.buffer_secs {
            SchedulePlan::RefreshNow
        } else {
            SchedulePlan::RefreshIn(Duration::from_secs(schedule_in))
        }
    }
}

struct ArmedTimer {
    generation: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// Slot holding at most one armed refresh timer.
///
/// Arming always aborts the previous timer. A firing timer calls
/// [`RefreshTimer::release`] with its own generation before doing any work,
/// so a reschedule issued from inside that work never aborts the running task.
///
/// Every `arm` and `cancel` advances the generation. Scheduled work that was
/// already spawned checks [`RefreshTimer::is_current`] before it touches the
/// session, so a cancel also stops work that `abort` can no longer reach.
#[derive(Default)]
pub(crate) struct RefreshTimer {
    slot: Mutex<Option<ArmedTimer>>,
    generation: AtomicU64,
}

impl RefreshTimer {
    /// Abort any armed timer and arm the task built by `spawn`.
    ///
    /// `spawn` receives the generation the task must pass to `release`; it
    /// runs under the slot lock so the task cannot release before it is stored.
    pub(crate) fn arm<F>(&self, delay: Duration, spawn: F)
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = spawn(generation);
        *slot = Some(ArmedTimer {
            generation,
            deadline: Instant::now() + delay,
            handle,
        });
    }

    /// Abort the armed timer, returning whether one was armed.
    pub(crate) fn cancel(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        match slot.take() {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Generation issued by the latest `arm` or `cancel`.
    pub(crate) fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// False once a later `arm` or `cancel` has superseded `generation`.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Empty the slot without aborting, if it still holds `generation`.
    pub(crate) fn release(&self, generation: u64) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|armed| armed.generation) == Some(generation) {
            *slot = None;
            return true;
        }
        false
    }

    /// Time left until the armed timer fires.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline.saturating_duration_since(Instant::now()))
    }

    pub(crate) fn is_armed(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .map(|armed| !armed.handle.is_finished())
            .unwrap_or(false)
    }
}
