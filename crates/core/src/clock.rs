// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for triggers and timestamps
//!
//! Roll triggers measure elapsed time through [`Clock::now`]; taggers and
//! event stamps use [`Clock::unix_millis`]. Tests drive both through
//! [`FakeClock`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides monotonic and wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch
    fn unix_millis(&self) -> i64;
}

/// Real system clock
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    unix_millis: i64,
}

/// Fake clock for testing with controllable time
///
/// Advancing moves the monotonic and wall-clock readings together.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at_unix_millis(1_257_358_333_997)
    }

    /// Create a fake clock whose wall-clock reading starts at `unix_millis`
    pub fn at_unix_millis(unix_millis: i64) -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                unix_millis,
            })),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        current.unix_millis += duration.as_millis() as i64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).instant
    }

    fn unix_millis(&self) -> i64 {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unix_millis
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
