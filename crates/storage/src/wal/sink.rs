// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink that writes events durably into the WAL
//!
//! Each open starts a new file in `writing`; close hands it to `logged`.

use super::manager::WalManager;
use super::writer::WalWriter;
use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError};
use std::sync::Arc;
use tracing::{debug, info};

pub struct WalSink {
    manager: Arc<WalManager>,
    prefix: String,
    writer: Option<WalWriter>,
    appended: u64,
    files: u64,
}

impl WalSink {
    pub fn new(manager: Arc<WalManager>, prefix: impl Into<String>) -> Self {
        Self {
            manager,
            prefix: prefix.into(),
            writer: None,
            appended: 0,
            files: 0,
        }
    }
}

#[async_trait]
impl EventSink for WalSink {
    fn name(&self) -> &str {
        "Wal"
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        if self.writer.is_some() {
            return Err(SinkError::AlreadyOpen("Wal".to_string()));
        }
        let writer = self.manager.new_writer(&self.prefix)?;
        debug!(path = %writer.path().display(), "wal file started");
        self.writer = Some(writer);
        self.files += 1;
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::NotOpen("Wal".to_string()))?;
        writer.append(&event)?;
        self.appended += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let Some(writer) = self.writer.take() else {
            info!(stage = "Wal", "double close");
            return Ok(());
        };
        self.manager.commit(writer)?;
        Ok(())
    }

    async fn report(&self) -> Report {
        let mut report = Report::new("Wal");
        report
            .set_long("appended", self.appended as i64)
            .set_long("files", self.files as i64)
            .set_string("dir", self.manager.base().display().to_string());
        report
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
