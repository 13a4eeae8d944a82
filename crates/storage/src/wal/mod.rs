// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log directory
//!
//! ## Architecture
//!
//! ```text
//! Event → WalSink → WalWriter → writing/  ──commit──▶ logged/
//!                                                       │ claim (rename)
//!                                 WalSource ◀── WalReader ◀ sending/
//!                                                       │
//!                                              sent/ or error/
//! ```
//!
//! ## Durability Guarantees
//!
//! - Every append is fsync'd before returning
//! - Checksums detect corruption from bit flips
//! - A truncated or corrupt record ends the readable region of a file;
//!   the records before it are still delivered
//! - `recover` moves `writing` and `sending` back to `logged`, so anything
//!   in flight at a crash is sent again (at-least-once)

pub mod manager;
pub mod reader;
pub mod record;
pub mod sink;
pub mod source;
pub mod writer;

pub use manager::{StateCounts, WalManager};
pub use reader::WalReader;
pub use record::{WalHeader, WalRecord};
pub use sink::WalSink;
pub use source::WalSource;
pub use writer::WalWriter;

use relay_core::{SinkError, SourceError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad header in {path}: {reason}")]
    BadHeader { path: String, reason: String },
    #[error("corrupted record at line {line}: {reason}")]
    Corrupted { line: u64, reason: String },
    #[error("checksum mismatch at line {line}")]
    ChecksumMismatch { line: u64 },
}

impl From<WalError> for SinkError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Io(io) => SinkError::Io(io),
            other => SinkError::Storage(Box::new(other)),
        }
    }
}

impl From<WalError> for SourceError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Io(io) => SourceError::Io(io),
            other => SourceError::Storage(Box::new(other)),
        }
    }
}

/// Lifecycle directory of a WAL file. Files only move forward, except
/// through `recover` and `retry_errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalState {
    Writing,
    Logged,
    Sending,
    Sent,
    Error,
}

impl WalState {
    pub const ALL: [WalState; 5] = [
        WalState::Writing,
        WalState::Logged,
        WalState::Sending,
        WalState::Sent,
        WalState::Error,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            WalState::Writing => "writing",
            WalState::Logged => "logged",
            WalState::Sending => "sending",
            WalState::Sent => "sent",
            WalState::Error => "error",
        }
    }
}

impl fmt::Display for WalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
