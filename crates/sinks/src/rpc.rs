// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink over an acknowledging network client
//!
//! The transport itself is external; this stage only turns its
//! acknowledgement into success, or a distinguishable "dropped" failure.

use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError};

/// Acknowledgement returned by the remote collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Ack,
    Committed,
    Error,
}

/// Network client boundary
#[async_trait]
pub trait AckedTransport: Send + Sync {
    async fn connect(&mut self) -> Result<(), SinkError>;

    async fn acked_append(&mut self, event: &Event) -> Result<AckStatus, SinkError>;

    async fn disconnect(&mut self) -> Result<(), SinkError>;
}

pub struct AckedSink<T> {
    transport: T,
    open: bool,
    acked: u64,
    committed: u64,
    dropped: u64,
}

impl<T: AckedTransport> AckedSink<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            open: false,
            acked: 0,
            committed: 0,
            dropped: 0,
        }
    }
}

#[async_trait]
impl<T: AckedTransport> EventSink for AckedSink<T> {
    fn name(&self) -> &str {
        "AckedRpc"
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        if self.open {
            return Err(SinkError::AlreadyOpen("AckedRpc".to_string()));
        }
        self.transport.connect().await?;
        self.open = true;
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotOpen("AckedRpc".to_string()));
        }
        match self.transport.acked_append(&event).await? {
            AckStatus::Ack => self.acked += 1,
            AckStatus::Committed => self.committed += 1,
            AckStatus::Error => {
                self.dropped += 1;
                return Err(SinkError::Dropped(format!(
                    "collector rejected event at {}",
                    event.timestamp_millis
                )));
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.transport.disconnect().await
    }

    async fn report(&self) -> Report {
        let mut report = Report::new("AckedRpc");
        report
            .set_long("acked", self.acked as i64)
            .set_long("committed", self.committed as i64)
            .set_long("dropped", self.dropped as i64);
        report
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
