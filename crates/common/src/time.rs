//! Clock abstraction for testable time handling
//!
//! Cache expiry is the only time-sensitive state in docbridge, and it must be
//! testable without waiting for real TTLs to elapse. Code that needs the
//! current time takes a [`Clock`] instead of calling `Instant::now()`
//! directly; production wires in [`SystemClock`], tests wire in [`MockClock`]
//! and advance it manually.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use docbridge_common::time::{Clock, MockClock, SystemClock};
//!
//! let clock = SystemClock;
//! let _now = clock.now();
//!
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

/// Source of the current time.
///
/// `now()` is monotonic and suitable for expiry arithmetic; `system_time()`
/// is wall-clock time for anything user-facing.
pub trait Clock: Send + Sync {
    /// Current monotonic instant.
    fn now(&self) -> Instant;

    /// Current wall-clock time.
    fn system_time(&self) -> SystemTime;
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Controllable clock for deterministic tests.
///
/// Starts at the current real time and only moves when told to. Clones share
/// the same elapsed state, so a clock handed to the code under test can be
/// advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: SystemTime,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time: SystemTime::now(),
        }
    }

    /// Advance the clock by `duration` without waiting.
    pub fn advance(&self, duration: Duration) {
        // Test utility: panic on poisoned mutex to fail tests early
        let mut elapsed = self.elapsed.lock().expect("mutex poisoned");
        *elapsed += duration;
    }

    /// Set the clock to an absolute elapsed time since creation.
    pub fn set_elapsed(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().expect("mutex poisoned");
        *elapsed = duration;
    }

    /// Simulated time since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().expect("mutex poisoned")
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().expect("mutex poisoned")
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + *self.elapsed.lock().expect("mutex poisoned")
    }
}
