// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault injector that fails every Nth append

use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError, SpecError, Wrapped};

const NAME: &str = "IntervalFlakey";

pub struct IntervalFlakey<S> {
    inner: Wrapped<S>,
    interval: u64,
    count: u64,
    injected: u64,
}

impl<S: EventSink> IntervalFlakey<S> {
    pub fn new(sink: S, interval: u64) -> Result<Self, SpecError> {
        if interval == 0 {
            return Err(SpecError::InvalidArgument {
                stage: "intervalFlakey".to_string(),
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        Ok(Self {
            inner: Wrapped::new(NAME, sink),
            interval,
            count: 0,
            injected: 0,
        })
    }
}

#[async_trait]
impl<S: EventSink> EventSink for IntervalFlakey<S> {
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
        self.count += 1;
        if self.count % self.interval == 0 {
            self.injected += 1;
            return Err(SinkError::Failed(format!(
                "flakey append {} (every {})",
                self.count, self.interval
            )));
        }
        self.inner.append(event).await
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let report = Report::new(NAME).with_long("injectedFailures", self.injected as i64);
        self.inner.report_into(report).await
    }
}

#[cfg(test)]
#[path = "flakey_tests.rs"]
mod tests;
