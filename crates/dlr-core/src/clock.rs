//! # Clocks
//!
//! Source of commit times for events that record "when the operation
//! happened" (`AuthorityAdded.at`, `LicenseRevoked.at`). Production uses
//! [`SystemClock`]; tests and script replay use [`ManualClock`].

use parking_lot::Mutex;

use crate::temporal::Timestamp;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current time, truncated to seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }

    /// Move forward by `secs` seconds. Saturates at the current value on overflow.
    pub fn advance(&self, secs: i64) {
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add_secs(secs) {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
