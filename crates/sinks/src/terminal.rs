// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal sinks: null, counter, and newline-delimited file output

use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink {
    open: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventSink for NullSink {
    fn name(&self) -> &str {
        "Null"
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.open = true;
        Ok(())
    }

    async fn append(&mut self, _event: Event) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotOpen("Null".to_string()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.open = false;
        Ok(())
    }

    async fn report(&self) -> Report {
        Report::new("Null")
    }
}

/// Counts appended events under its own name
#[derive(Debug)]
pub struct CounterSink {
    name: String,
    count: u64,
    open: bool,
}

impl CounterSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            open: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[async_trait]
impl EventSink for CounterSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.open = true;
        Ok(())
    }

    async fn append(&mut self, _event: Event) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotOpen(self.name.clone()));
        }
        self.count += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.open = false;
        Ok(())
    }

    async fn report(&self) -> Report {
        Report::new(self.name.clone()).with_long(self.name.clone(), self.count as i64)
    }
}

/// Writes one serialized event per line to a fresh file for every open
pub struct FileSink {
    dir: PathBuf,
    writer: Option<BufWriter<File>>,
    current: Option<PathBuf>,
    written: u64,
    files: u64,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writer: None,
            current: None,
            written: 0,
            files: 0,
        }
    }

    /// Path of the file being written, if open
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

static FILE_SEQ: AtomicU64 = AtomicU64::new(0);

fn file_name() -> String {
    let seq = FILE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!(
        "events-{}-{seq:06}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S%3f")
    )
}

#[async_trait]
impl EventSink for FileSink {
    fn name(&self) -> &str {
        "File"
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        if self.writer.is_some() {
            return Err(SinkError::AlreadyOpen("File".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name());
        let file = tokio::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .await?;
        debug!(path = %path.display(), "file sink opened");
        self.writer = Some(BufWriter::new(file));
        self.current = Some(path);
        self.files += 1;
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::NotOpen("File".to_string()))?;
        let mut line = event.to_bytes()?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        self.current = None;
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        Ok(())
    }

    async fn report(&self) -> Report {
        let mut report = Report::new("File");
        report
            .set_long("written", self.written as i64)
            .set_long("files", self.files as i64)
            .set_string("dir", self.dir.display().to_string());
        report
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
