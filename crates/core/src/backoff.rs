// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backoff policies for retrying stages
//!
//! A policy tracks the delay before the next retry. `backoff()` schedules the
//! next retry at `now + sleep_increment()` and grows the increment
//! exponentially up to a per-attempt cap. Growth depends only on the number of
//! `backoff()` calls since the last `reset()`.

use crate::report::Report;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A backoff wait was cut short by cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("backoff wait cancelled")]
pub struct Cancelled;

/// Retry delay state machine
#[async_trait]
pub trait BackoffPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Delay the next `backoff()` will schedule
    fn sleep_increment(&self) -> Duration;

    /// Schedule the next retry and grow the delay
    fn backoff(&mut self);

    /// Whether the scheduled retry time has passed
    fn is_retry_ok(&self) -> bool;

    /// Whether the policy has given up
    fn is_failed(&self) -> bool;

    /// Restore the initial delay and clear accumulated state
    fn reset(&mut self);

    /// Sleep until the scheduled retry time, or fail fast on cancellation
    async fn wait_until_retry_ok(&self, cancel: &CancellationToken) -> Result<(), Cancelled>;

    fn report(&self) -> Report;
}

/// Exponential backoff with a per-attempt cap; never gives up
#[derive(Debug, Clone)]
pub struct CappedExponentialBackoff {
    initial: Duration,
    max: Duration,
    increment: Duration,
    retry_at: Option<Instant>,
    count: u64,
}

impl CappedExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            increment: initial,
            retry_at: None,
            count: 0,
        }
    }

    pub fn backoff_count(&self) -> u64 {
        self.count
    }
}

#[async_trait]
impl BackoffPolicy for CappedExponentialBackoff {
    fn name(&self) -> &'static str {
        "CappedExpBackoff"
    }

    fn sleep_increment(&self) -> Duration {
        self.increment
    }

    fn backoff(&mut self) {
        self.retry_at = Some(Instant::now() + self.increment);
        self.count += 1;
        self.increment = self.increment.saturating_mul(2).min(self.max);
    }

    fn is_retry_ok(&self) -> bool {
        self.retry_at.map_or(true, |at| Instant::now() >= at)
    }

    fn is_failed(&self) -> bool {
        false
    }

    fn reset(&mut self) {
        self.increment = self.initial;
        self.retry_at = None;
        self.count = 0;
    }

    async fn wait_until_retry_ok(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        wait_until(self.retry_at, cancel).await
    }

    fn report(&self) -> Report {
        let mut report = Report::new(self.name());
        report
            .set_long("backoffCount", self.count as i64)
            .set_long("sleepIncrement", self.increment.as_millis() as i64)
            .set_long("maxSleep", self.max.as_millis() as i64)
            .set_long("failed", 0);
        report
    }
}

/// Exponential backoff that gives up once the accumulated delay exceeds a cap.
/// A zero delay never accumulates, so it gives up after the first backoff.
#[derive(Debug, Clone)]
pub struct CumulativeCappedExponentialBackoff {
    inner: CappedExponentialBackoff,
    cumulative: Duration,
    cumulative_cap: Duration,
}

impl CumulativeCappedExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, cumulative_cap: Duration) -> Self {
        Self {
            inner: CappedExponentialBackoff::new(initial, max),
            cumulative: Duration::ZERO,
            cumulative_cap,
        }
    }

    pub fn cumulative(&self) -> Duration {
        self.cumulative
    }
}

#[async_trait]
impl BackoffPolicy for CumulativeCappedExponentialBackoff {
    fn name(&self) -> &'static str {
        "CumulativeCappedExpBackoff"
    }

    fn sleep_increment(&self) -> Duration {
        self.inner.sleep_increment()
    }

    fn backoff(&mut self) {
        self.cumulative += self.inner.sleep_increment();
        self.inner.backoff();
    }

    fn is_retry_ok(&self) -> bool {
        self.inner.is_retry_ok()
    }

    fn is_failed(&self) -> bool {
        self.cumulative > self.cumulative_cap
            || (self.inner.backoff_count() > 0 && self.inner.sleep_increment().is_zero())
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.cumulative = Duration::ZERO;
    }

    async fn wait_until_retry_ok(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        self.inner.wait_until_retry_ok(cancel).await
    }

    fn report(&self) -> Report {
        let mut report = self.inner.report();
        report.name = self.name().to_string();
        report
            .set_string("name", self.name())
            .set_long("cumulativeBackoff", self.cumulative.as_millis() as i64)
            .set_long("cumulativeCap", self.cumulative_cap.as_millis() as i64)
            .set_long("failed", i64::from(self.is_failed()));
        report
    }
}

async fn wait_until(retry_at: Option<Instant>, cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    let Some(at) = retry_at else {
        return Ok(());
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep_until(at) => Ok(()),
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
