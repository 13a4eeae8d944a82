// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink stage trait and the decorator forwarding helper
//!
//! A sink moves through `closed → open → closed`. Decorators own exactly one
//! inner sink through [`Wrapped`], which enforces the lifecycle and makes a
//! second close a logged no-op.

use crate::error::SinkError;
use crate::event::Event;
use crate::report::Report;
use async_trait::async_trait;

/// A pipeline stage that accepts events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Stable name used in reports and logs
    fn name(&self) -> &str;

    async fn open(&mut self) -> Result<(), SinkError>;

    async fn append(&mut self, event: Event) -> Result<(), SinkError>;

    async fn close(&mut self) -> Result<(), SinkError>;

    /// Snapshot of this stage's metrics, valid whether open or closed
    async fn report(&self) -> Report;
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        (**self).open().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        (**self).append(event).await
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        (**self).close().await
    }

    async fn report(&self) -> Report {
        (**self).report().await
    }
}

/// Exclusively owned child of a decorator
pub struct Wrapped<S> {
    sink: S,
    open: bool,
    owner: &'static str,
}

impl<S: EventSink> Wrapped<S> {
    pub fn new(owner: &'static str, sink: S) -> Self {
        Self {
            sink,
            open: false,
            owner,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn inner(&self) -> &S {
        &self.sink
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Open the child; the stage is marked open only if the child opened
    pub async fn open(&mut self) -> Result<(), SinkError> {
        if self.open {
            return Err(SinkError::AlreadyOpen(self.owner.to_string()));
        }
        tracing::debug!(stage = self.owner, child = self.sink.name(), "opening");
        self.sink.open().await?;
        self.open = true;
        Ok(())
    }

    /// Mark the stage open before opening the child, keeping it open even
    /// when the child fails so later appends can retry recovery.
    pub async fn open_lenient(&mut self) -> Result<(), SinkError> {
        self.open = true;
        tracing::debug!(stage = self.owner, child = self.sink.name(), "opening (lenient)");
        self.sink.open().await
    }

    pub async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotOpen(self.owner.to_string()));
        }
        self.sink.append(event).await
    }

    /// Close the child once; further calls are no-ops
    pub async fn close(&mut self) -> Result<(), SinkError> {
        if !self.open {
            tracing::info!(stage = self.owner, "double close");
            return Ok(());
        }
        self.open = false;
        tracing::debug!(stage = self.owner, child = self.sink.name(), "closing");
        self.sink.close().await
    }

    /// Attach the child's report under its name
    pub async fn report_into(&self, mut report: Report) -> Report {
        let child = self.sink.report().await;
        report.add_child(self.sink.name().to_string(), child);
        report
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
