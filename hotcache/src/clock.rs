//! Time sources for stamping builds

use crate::key::Timestamp;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Source of build timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time
    fn now(&self) -> Timestamp;
}

/// Wall clock; the default for every cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from(SystemTime::now())
    }
}

/// Clock that only moves when told to.
///
/// Lets tests and embedders make staleness deterministic: touch a resource
/// at `clock.advance(1)` and the next build is stamped no earlier than it.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Move the clock forward and return the new reading
    pub fn advance(&self, millis: u64) -> Timestamp {
        let previous = self.millis.fetch_add(millis, Ordering::SeqCst);
        Timestamp::from_millis(previous.saturating_add(millis))
    }

    /// Set the clock to an absolute reading
    pub fn set(&self, time: Timestamp) {
        self.millis.store(time.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
