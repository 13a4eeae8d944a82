// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL file framing
//!
//! A file is one header line followed by one record per line. Each record
//! carries a CRC32 of its serialized event.

use super::WalError;
use relay_core::Event;
use serde::{Deserialize, Serialize};

pub const FORMAT: &str = "relay-wal";
pub const VERSION: u32 = 1;

/// First line of every WAL file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalHeader {
    pub format: String,
    pub version: u32,
    pub created_millis: i64,
    pub host: String,
}

impl WalHeader {
    pub fn new(created_millis: i64, host: &str) -> Self {
        Self {
            format: FORMAT.to_string(),
            version: VERSION,
            created_millis,
            host: host.to_string(),
        }
    }

    /// Parse and check a header line
    pub fn from_line(line: &str, path: &str) -> Result<Self, WalError> {
        let bad = |reason: String| WalError::BadHeader {
            path: path.to_string(),
            reason,
        };
        let header: WalHeader = serde_json::from_str(line).map_err(|e| bad(e.to_string()))?;
        if header.format != FORMAT {
            return Err(bad(format!("unknown format '{}'", header.format)));
        }
        if header.version != VERSION {
            return Err(bad(format!("unsupported version {}", header.version)));
        }
        Ok(header)
    }
}

/// One durable event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: u64,
    pub checksum: u32,
    pub event: Event,
}

impl WalRecord {
    pub fn new(seq: u64, event: Event) -> Result<Self, WalError> {
        let checksum = checksum(&event)?;
        Ok(Self {
            seq,
            checksum,
            event,
        })
    }

    /// Verify the checksum matches the event
    pub fn verify(&self) -> bool {
        checksum(&self.event).is_ok_and(|sum| sum == self.checksum)
    }

    /// Serialize to one line of JSON, without the newline
    pub fn to_line(&self) -> Result<String, WalError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self, WalError> {
        Ok(serde_json::from_str(line)?)
    }
}

fn checksum(event: &Event) -> Result<u32, WalError> {
    Ok(crc32fast::hash(&event.to_bytes()?))
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
