// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stubborn append: on failure, reopen the child and try once more
//!
//! `appendSuccess` counts every delivered event, including those delivered
//! by the retry; `appendRecovers` counts only the latter.

use async_trait::async_trait;
use relay_core::{Context, Event, EventSink, Report, SinkError, Wrapped};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const NAME: &str = "StubbornAppend";

pub struct StubbornAppend<S> {
    inner: Wrapped<S>,
    cancel: CancellationToken,
    successes: u64,
    fails: u64,
    recovers: u64,
}

impl<S: EventSink> StubbornAppend<S> {
    pub fn new(ctx: &Context, sink: S) -> Self {
        Self {
            inner: Wrapped::new(NAME, sink),
            cancel: ctx.cancel_token().clone(),
            successes: 0,
            fails: 0,
            recovers: 0,
        }
    }

    pub fn inner(&self) -> &S {
        self.inner.inner()
    }
}

#[async_trait]
impl<S: EventSink> EventSink for StubbornAppend<S> {
    fn name(&self) -> &str {
        NAME
    }

    /// The stage counts as open even when the child refuses to open, so the
    /// first append gets a chance to reopen it.
    async fn open(&mut self) -> Result<(), SinkError> {
        self.inner.open_lenient().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let cause = match self.inner.append(event.clone()).await {
            Ok(()) => {
                self.successes += 1;
                return Ok(());
            }
            Err(e @ SinkError::NotOpen(_)) if !self.inner.is_open() => return Err(e),
            Err(e) => e,
        };
        self.fails += 1;
        info!(error = %cause, "append failed, reopening child");

        if let Err(e) = self.inner.close().await {
            debug!(error = %e, "close before reopen failed");
        }
        if self.cancel.is_cancelled() {
            warn!("interrupted before reopen");
            return Err(SinkError::interrupted());
        }
        self.inner.open_lenient().await?;
        self.inner.append(event).await?;
        self.successes += 1;
        self.recovers += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let mut report = Report::new(NAME);
        report
            .set_long("appendSuccess", self.successes as i64)
            .set_long("appendFails", self.fails as i64)
            .set_long("appendRecovers", self.recovers as i64);
        self.inner.report_into(report).await
    }
}

#[cfg(test)]
#[path = "stubborn_tests.rs"]
mod tests;
