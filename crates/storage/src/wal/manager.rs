// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL directory manager
//!
//! Owns the state directories under one base path and moves files between
//! them with atomic renames. File names embed their creation time:
//! `<prefix>.<millis:013>.<seq:08>.wal`.

use super::writer::WalWriter;
use super::{WalError, WalState};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

const SUFFIX: &str = ".wal";

static FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Number of files in each state directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub writing: usize,
    pub logged: usize,
    pub sending: usize,
    pub sent: usize,
    pub error: usize,
}

impl fmt::Display for StateCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "writing {}\nlogged {}\nsending {}\nsent {}\nerror {}",
            self.writing, self.logged, self.sending, self.sent, self.error
        )
    }
}

impl StateCounts {
    fn slot(&mut self, state: WalState) -> &mut usize {
        match state {
            WalState::Writing => &mut self.writing,
            WalState::Logged => &mut self.logged,
            WalState::Sending => &mut self.sending,
            WalState::Sent => &mut self.sent,
            WalState::Error => &mut self.error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalManager {
    base: PathBuf,
}

/// Build a WAL file name
pub fn file_name(prefix: &str, created_millis: i64, seq: u64) -> String {
    format!("{prefix}.{created_millis:013}.{seq:08}{SUFFIX}")
}

/// Recover `(millis, seq)` from a WAL file name
pub fn parse_file_name(name: &str) -> Option<(i64, u64)> {
    let stem = name.strip_suffix(SUFFIX)?;
    let mut parts = stem.rsplitn(3, '.');
    let seq = parts.next()?.parse().ok()?;
    let millis = parts.next()?.parse().ok()?;
    parts.next()?;
    Some((millis, seq))
}

impl WalManager {
    /// Open a WAL directory, creating the state directories as needed
    pub fn open(base: impl Into<PathBuf>) -> Result<Self, WalError> {
        let manager = Self { base: base.into() };
        for state in WalState::ALL {
            fs::create_dir_all(manager.dir(state))?;
        }
        debug!(base = %manager.base.display(), "wal directory opened");
        Ok(manager)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn dir(&self, state: WalState) -> PathBuf {
        self.base.join(state.dir_name())
    }

    pub fn path(&self, state: WalState, name: &str) -> PathBuf {
        self.dir(state).join(name)
    }

    /// Start a new file in `writing`
    pub fn new_writer(&self, prefix: &str) -> Result<WalWriter, WalError> {
        self.new_writer_at(prefix, chrono::Utc::now().timestamp_millis())
    }

    pub fn new_writer_at(&self, prefix: &str, created_millis: i64) -> Result<WalWriter, WalError> {
        let seq = FILE_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = file_name(prefix, created_millis, seq);
        WalWriter::create(&self.path(WalState::Writing, &name), created_millis)
    }

    /// Sync a finished writer and hand its file to `logged`
    pub fn commit(&self, mut writer: WalWriter) -> Result<String, WalError> {
        writer.sync()?;
        let name = file_name_of(writer.path())?;
        drop(writer);
        self.transition(&name, WalState::Writing, WalState::Logged)?;
        debug!(file = %name, "wal file logged");
        Ok(name)
    }

    /// File names in `state`, oldest first
    pub fn list(&self, state: WalState) -> Result<Vec<String>, WalError> {
        let mut keyed = Vec::new();
        for entry in fs::read_dir(self.dir(state))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let (millis, seq) = match parse_file_name(&name) {
                Some(key) => key,
                None => (modified_millis(&entry.path()), 0),
            };
            keyed.push((millis, seq, name));
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, _, name)| name).collect())
    }

    /// Requeue anything left in `writing` or `sending` by a crash.
    /// Run before any writer or reader of this directory starts.
    pub fn recover(&self) -> Result<Vec<String>, WalError> {
        let mut moved = Vec::new();
        for from in [WalState::Writing, WalState::Sending] {
            for name in self.list(from)? {
                match self.transition(&name, from, WalState::Logged) {
                    Ok(()) => {
                        info!(file = %name, from = %from, "recovered wal file");
                        moved.push(name);
                    }
                    Err(WalError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(moved)
    }

    /// Move the oldest `logged` file to `sending` and return its name. A
    /// file claimed by someone else between listing and renaming is skipped.
    pub fn claim_next(&self) -> Result<Option<String>, WalError> {
        for name in self.list(WalState::Logged)? {
            match self.transition(&name, WalState::Logged, WalState::Sending) {
                Ok(()) => return Ok(Some(name)),
                Err(WalError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(file = %name, "lost claim race");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    pub fn mark_sent(&self, name: &str) -> Result<(), WalError> {
        self.transition(name, WalState::Sending, WalState::Sent)
    }

    pub fn mark_error(&self, name: &str) -> Result<(), WalError> {
        self.transition(name, WalState::Sending, WalState::Error)
    }

    /// Give a claimed file back unread
    pub fn release(&self, name: &str) -> Result<(), WalError> {
        self.transition(name, WalState::Sending, WalState::Logged)
    }

    /// Requeue quarantined files (operator action)
    pub fn retry_errors(&self) -> Result<Vec<String>, WalError> {
        let names = self.list(WalState::Error)?;
        for name in &names {
            self.transition(name, WalState::Error, WalState::Logged)?;
            info!(file = %name, "requeued wal file from error");
        }
        Ok(names)
    }

    pub fn state_counts(&self) -> Result<StateCounts, WalError> {
        let mut counts = StateCounts::default();
        for state in WalState::ALL {
            *counts.slot(state) = self.list(state)?.len();
        }
        Ok(counts)
    }

    fn transition(&self, name: &str, from: WalState, to: WalState) -> Result<(), WalError> {
        fs::rename(self.path(from, name), self.path(to, name))?;
        Ok(())
    }
}

fn file_name_of(path: &Path) -> Result<String, WalError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            WalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no file name in {}", path.display()),
            ))
        })
}

fn modified_millis(path: &Path) -> i64 {
    let modified = fs::metadata(path).and_then(|m| m.modified());
    match modified {
        Ok(at) => at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no mtime for wal file");
            0
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
