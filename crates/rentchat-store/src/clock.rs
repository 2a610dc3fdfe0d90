//! Time source for message and presence timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::models::Millis;

pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> Millis;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Used to pin timestamps in tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Millis) {
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Coarse relative label for the thread list ("3 min ago").
pub fn time_ago(ts: Millis, now: Millis) -> String {
    const MINUTE: Millis = 60 * 1000;
    const HOUR: Millis = 60 * MINUTE;
    const DAY: Millis = 24 * HOUR;

    let diff = now - ts;
    if diff < MINUTE {
        "just now".to_string()
    } else if diff < HOUR {
        format!("{} min ago", diff / MINUTE)
    } else if diff < DAY {
        format!("{} hours ago", diff / HOUR)
    } else {
        format!("{} days ago", diff / DAY)
    }
}
