// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source stage trait

use crate::error::SourceError;
use crate::event::Event;
use crate::report::Report;
use async_trait::async_trait;

/// A pipeline stage that produces events
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    async fn open(&mut self) -> Result<(), SourceError>;

    /// Next event, blocking until one is available; `None` is end of stream
    async fn next(&mut self) -> Result<Option<Event>, SourceError>;

    async fn close(&mut self) -> Result<(), SourceError>;

    async fn report(&self) -> Report;
}

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        (**self).open().await
    }

    async fn next(&mut self) -> Result<Option<Event>, SourceError> {
        (**self).next().await
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        (**self).close().await
    }

    async fn report(&self) -> Report {
        (**self).report().await
    }
}
