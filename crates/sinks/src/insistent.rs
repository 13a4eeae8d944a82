// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Insistent append: retry a downstream append with backoff
//!
//! A request loops until the child accepts the event, the backoff policy
//! gives up, the stage closes, or the context is cancelled. Every failed
//! attempt is kept in order and returned with the final error.

use async_trait::async_trait;
use relay_core::{
    BackoffPolicy, CappedExponentialBackoff, Context, CumulativeCappedExponentialBackoff, Event,
    EventSink, Report, RetryHistory, SinkError, Wrapped,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const NAME: &str = "InsistentAppend";

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    requests: u64,
    attempts: u64,
    successes: u64,
    retries: u64,
    giveups: u64,
}

pub struct InsistentAppend<S> {
    inner: Wrapped<S>,
    backoff: Box<dyn BackoffPolicy>,
    cancel: CancellationToken,
    counters: Counters,
}

impl<S: EventSink> InsistentAppend<S> {
    pub fn new(ctx: &Context, sink: S, backoff: Box<dyn BackoffPolicy>) -> Self {
        Self {
            inner: Wrapped::new(NAME, sink),
            backoff,
            cancel: ctx.cancel_token().clone(),
            counters: Counters::default(),
        }
    }

    /// Retries forever, delays doubling from `initial` up to `max_single`
    pub fn capped(ctx: &Context, sink: S, max_single: Duration, initial: Duration) -> Self {
        Self::new(
            ctx,
            sink,
            Box::new(CappedExponentialBackoff::new(initial, max_single)),
        )
    }

    /// Gives up once the summed delays exceed `cumulative_max`
    pub fn cumulative(
        ctx: &Context,
        sink: S,
        max_single: Duration,
        initial: Duration,
        cumulative_max: Duration,
    ) -> Self {
        Self::new(
            ctx,
            sink,
            Box::new(CumulativeCappedExponentialBackoff::new(
                initial,
                max_single,
                cumulative_max,
            )),
        )
    }

    /// Build from the context defaults
    pub fn from_defaults(ctx: &Context, sink: S) -> Self {
        let d = ctx.defaults();
        match d.max_cumulative_backoff {
            Some(cap) => Self::cumulative(
                ctx,
                sink,
                d.max_single_backoff,
                d.insistent_initial_backoff,
                cap,
            ),
            None => Self::capped(ctx, sink, d.max_single_backoff, d.insistent_initial_backoff),
        }
    }

    pub fn inner(&self) -> &S {
        self.inner.inner()
    }
}

#[async_trait]
impl<S: EventSink> EventSink for InsistentAppend<S> {
    fn name(&self) -> &str {
        NAME
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.inner.open().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        if !self.inner.is_open() {
            return Err(SinkError::NotOpen(NAME.to_string()));
        }
        self.counters.requests += 1;
        let mut history = RetryHistory::new();

        while !self.backoff.is_failed() && self.inner.is_open() && !self.cancel.is_cancelled() {
            self.counters.attempts += 1;
            let cause = match self.inner.append(event.clone()).await {
                Ok(()) => {
                    self.counters.successes += 1;
                    self.backoff.reset();
                    return Ok(());
                }
                Err(e) => e,
            };

            let delay = self.backoff.sleep_increment();
            info!(
                attempt = history.len() + 1,
                backoff_ms = delay.as_millis() as u64,
                error = %cause,
                "append failed, backing off",
            );
            history.push(cause);
            self.backoff.backoff();
            if self.backoff.is_failed() {
                break;
            }
            if self.backoff.wait_until_retry_ok(&self.cancel).await.is_err() {
                warn!(attempts = history.len(), "append interrupted during backoff");
                return Err(SinkError::Interrupted(history));
            }
            self.counters.retries += 1;
        }

        if self.cancel.is_cancelled() {
            warn!(attempts = history.len(), "append interrupted");
            return Err(SinkError::Interrupted(history));
        }

        self.counters.giveups += 1;
        warn!(
            attempts = history.len(),
            policy = self.backoff.name(),
            "giving up on append",
        );
        // next request starts with a fresh budget
        self.backoff.reset();
        Err(SinkError::Exhausted(history))
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let c = self.counters;
        let mut report = Report::new(NAME);
        report
            .set_long("appendRequests", c.requests as i64)
            .set_long("appendAttempts", c.attempts as i64)
            .set_long("appendSuccesses", c.successes as i64)
            .set_long("appendRetries", c.retries as i64)
            .set_long("appendGiveups", c.giveups as i64)
            .add_child(
                format!("backoffPolicy.{}", self.backoff.name()),
                self.backoff.report(),
            );
        self.inner.report_into(report).await
    }
}

#[cfg(test)]
#[path = "insistent_tests.rs"]
mod tests;
