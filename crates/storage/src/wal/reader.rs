// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL reader with corruption detection
//!
//! Opening checks the header; reading stops at the first record that fails
//! to parse or verify, which marks the truncation point.

use super::record::{WalHeader, WalRecord};
use super::WalError;
use relay_core::Event;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct WalReader {
    path: PathBuf,
    reader: BufReader<File>,
    header: WalHeader,
    line: u64,
    delivered: u64,
}

impl WalReader {
    /// Open a WAL file. An empty file or a missing, truncated, or foreign
    /// header is an error.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let display = path.display().to_string();
        let mut reader = BufReader::new(File::open(path)?);
        let mut first = String::new();
        let read = reader.read_line(&mut first).map_err(|e| WalError::BadHeader {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        if read == 0 {
            return Err(WalError::BadHeader {
                path: display,
                reason: "empty file".to_string(),
            });
        }
        if !first.ends_with('\n') {
            return Err(WalError::BadHeader {
                path: display,
                reason: "truncated header".to_string(),
            });
        }
        let header = WalHeader::from_line(first.trim_end(), &display)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header,
            line: 1,
            delivered: 0,
        })
    }

    /// Next event in file order; `Ok(None)` at a clean end of file
    pub fn next_event(&mut self) -> Result<Option<Event>, WalError> {
        loop {
            let mut buf = String::new();
            let read = self
                .reader
                .read_line(&mut buf)
                .map_err(|e| WalError::Corrupted {
                    line: self.line + 1,
                    reason: e.to_string(),
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let trimmed = buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = WalRecord::from_line(trimmed).map_err(|e| WalError::Corrupted {
                line: self.line,
                reason: e.to_string(),
            })?;
            if !record.verify() {
                return Err(WalError::ChecksumMismatch { line: self.line });
            }
            self.delivered += 1;
            return Ok(Some(record.event));
        }
    }

    /// Read every valid event, stopping quietly at corruption
    pub fn read_valid(path: &Path) -> Result<Vec<Event>, WalError> {
        let mut reader = Self::open(path)?;
        let mut events = Vec::new();
        while let Ok(Some(event)) = reader.next_event() {
            events.push(event);
        }
        Ok(events)
    }

    pub fn header(&self) -> &WalHeader {
        &self.header
    }

    /// Events returned so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
