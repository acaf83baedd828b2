//! Time source abstraction.
//!
//! Every time-boxed decision (rate-limit windows, ban and restriction expiry,
//! notification de-duplication) reads "now" through a [`Clock`] so tests can
//! move time without sleeping.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::db::unix_timestamp;

/// Seconds in a minute, hour and day, used when converting durations.
pub const SECS_PER_MINUTE: i64 = 60;
pub const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
pub const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// A source of Unix timestamps (seconds).
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        unix_timestamp()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, ts: i64) {
        self.now.store(ts, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
