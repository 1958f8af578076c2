//! Nullable clock: deterministic time for testing.

use quorum_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            current: AtomicU64::new(initial.as_nanos()),
        }
    }

    /// Advance time by `by`.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.current.fetch_add(by, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, at: Timestamp) {
        self.current.store(at.as_nanos(), Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.current.load(Ordering::SeqCst))
    }
}

impl Default for NullClock {
    fn default() -> Self {
        Self::new(Timestamp::from_secs(1_700_000_000))
    }
}
