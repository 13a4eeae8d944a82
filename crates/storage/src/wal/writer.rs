// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL writer for durable append operations

use super::record::{WalHeader, WalRecord};
use super::WalError;
use relay_core::event::local_host;
use relay_core::Event;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends records to one new WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,
    next_seq: u64,
    bytes_written: u64,
}

impl WalWriter {
    /// Create the file and durably write its header. Fails if it exists.
    pub fn create(path: &Path, created_millis: i64) -> Result<Self, WalError> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)?;
        let header = serde_json::to_string(&WalHeader::new(created_millis, local_host()))?;
        file.write_all(header.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_seq: 0,
            bytes_written: header.len() as u64 + 1,
        })
    }

    /// Append an event; it is on disk when this returns
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.next_seq;
        let line = WalRecord::new(seq, event.clone())?.to_line()?;

        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.sync_all()?;

        self.next_seq += 1;
        self.bytes_written += line.len() as u64 + 1;
        Ok(seq)
    }

    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Records written so far
    pub fn entries(&self) -> u64 {
        self.next_seq
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
