// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source that replays logged WAL files
//!
//! Files are claimed oldest first and read in order. A file that will not
//! open goes to `error`; a file that breaks partway delivers what precedes
//! the break and then goes to `error`; a fully read file goes to `sent`.
//! None of these stop the scan, and none surface as errors from `next`.

use super::manager::WalManager;
use super::reader::WalReader;
use super::WalState;
use async_trait::async_trait;
use relay_core::{Context, Event, EventSource, Report, SourceError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    entries: u64,
    files_sent: u64,
    files_failed: u64,
    files_corrupt: u64,
}

struct Claimed {
    name: String,
    reader: WalReader,
}

pub struct WalSource {
    manager: Arc<WalManager>,
    poll_interval: Duration,
    cancel: CancellationToken,
    stop: CancellationToken,
    open: bool,
    closed: bool,
    current: Option<Claimed>,
    counters: Counters,
}

impl WalSource {
    pub fn new(ctx: &Context, manager: Arc<WalManager>) -> Self {
        Self {
            manager,
            poll_interval: ctx.defaults().wal_poll_interval,
            cancel: ctx.cancel_token().clone(),
            stop: CancellationToken::new(),
            open: false,
            closed: false,
            current: None,
            counters: Counters::default(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Token that ends the stream: once cancelled, `next` drains what is
    /// already logged and then returns `None` instead of waiting.
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Next event if one is available now, without waiting
    pub fn try_next(&mut self) -> Result<Option<Event>, SourceError> {
        if !self.open {
            return Err(SourceError::NotOpen("Wal".to_string()));
        }
        Ok(self.poll_once())
    }

    fn poll_once(&mut self) -> Option<Event> {
        loop {
            if let Some(claimed) = self.current.as_mut() {
                match claimed.reader.next_event() {
                    Ok(Some(event)) => {
                        self.counters.entries += 1;
                        return Some(event);
                    }
                    Ok(None) => self.finish_current(WalState::Sent),
                    Err(e) => {
                        error!(
                            file = %claimed.name,
                            delivered = claimed.reader.delivered(),
                            error = %e,
                            "wal file corrupt after valid prefix",
                        );
                        self.finish_current(WalState::Error);
                    }
                }
                continue;
            }

            let name = match self.manager.claim_next() {
                Ok(Some(name)) => name,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "wal scan failed, will retry");
                    return None;
                }
            };
            match WalReader::open(&self.manager.path(WalState::Sending, &name)) {
                Ok(reader) => {
                    debug!(file = %name, "reading wal file");
                    self.current = Some(Claimed { name, reader });
                }
                Err(e) => {
                    error!(file = %name, error = %e, "wal file failed to open, quarantining");
                    self.counters.files_failed += 1;
                    if let Err(e) = self.manager.mark_error(&name) {
                        error!(file = %name, error = %e, "could not quarantine wal file");
                    }
                }
            }
        }
    }

    fn finish_current(&mut self, to: WalState) {
        let Some(claimed) = self.current.take() else {
            return;
        };
        let moved = match to {
            WalState::Sent => {
                self.counters.files_sent += 1;
                self.manager.mark_sent(&claimed.name)
            }
            _ => {
                self.counters.files_corrupt += 1;
                self.manager.mark_error(&claimed.name)
            }
        };
        if let Err(e) = moved {
            error!(file = %claimed.name, to = %to, error = %e, "could not move wal file");
        }
    }
}

#[async_trait]
impl EventSource for WalSource {
    fn name(&self) -> &str {
        "Wal"
    }

    /// Never fails on unreadable content; `next` keeps rescanning instead
    async fn open(&mut self) -> Result<(), SourceError> {
        if self.open {
            return Err(SourceError::AlreadyOpen("Wal".to_string()));
        }
        self.open = true;
        match self.manager.state_counts() {
            Ok(counts) => info!(logged = counts.logged, error = counts.error, "wal source opened"),
            Err(e) => warn!(error = %e, "wal source opened on unreadable directory"),
        }
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Event>, SourceError> {
        if !self.open {
            if self.closed {
                return Ok(None);
            }
            return Err(SourceError::NotOpen("Wal".to_string()));
        }
        loop {
            // read before scanning so one full scan follows the stop
            let stopping = self.stop.is_cancelled();
            if let Some(event) = self.poll_once() {
                return Ok(Some(event));
            }
            if stopping {
                return Ok(None);
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SourceError::Interrupted),
                _ = self.stop.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if !self.open {
            info!(stage = "Wal", "double close");
            return Ok(());
        }
        self.open = false;
        self.closed = true;
        // a partly read file is replayed from the start next time
        if let Some(claimed) = self.current.take() {
            self.manager.release(&claimed.name)?;
        }
        Ok(())
    }

    async fn report(&self) -> Report {
        let c = self.counters;
        let mut report = Report::new("Wal");
        report
            .set_long("entries", c.entries as i64)
            .set_long("filesSent", c.files_sent as i64)
            .set_long("filesFailed", c.files_failed as i64)
            .set_long("filesCorrupt", c.files_corrupt as i64);
        report
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
