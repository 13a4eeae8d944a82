// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event record passed through the pipeline
//!
//! An event is a byte body plus a timestamp, a process-unique nanos id, a
//! priority, the originating host and a map of named byte attributes.
//! Stages downstream of the creator only ever add or overwrite attributes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Event priority, most severe first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Fatal,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// A timestamped byte payload with named attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub body: Vec<u8>,
    /// Milliseconds since Unix epoch at creation
    pub timestamp_millis: i64,
    /// Strictly increasing within one process
    pub nanos: i64,
    pub priority: Priority,
    pub host: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<u8>>,
}

impl Event {
    /// Create an event stamped with the current time and local host
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self::with_timestamp(body, chrono::Utc::now().timestamp_millis())
    }

    /// Create an event with an explicit creation timestamp
    pub fn with_timestamp(body: impl Into<Vec<u8>>, timestamp_millis: i64) -> Self {
        Self {
            body: body.into(),
            timestamp_millis,
            nanos: next_nanos(),
            priority: Priority::default(),
            host: local_host().to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Add or overwrite a named attribute
    pub fn set(&mut self, attr: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.attributes.insert(attr.into(), value.into());
    }

    pub fn get(&self, attr: &str) -> Option<&[u8]> {
        self.attributes.get(attr).map(Vec::as_slice)
    }

    /// Serialize to the canonical byte form used by batching, gzip and the WAL
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Monotonic id: nanoseconds since first use, bumped to stay unique
fn next_nanos() -> i64 {
    static START: OnceLock<Instant> = OnceLock::new();
    static LAST: AtomicI64 = AtomicI64::new(0);

    let elapsed = START.get_or_init(Instant::now).elapsed().as_nanos() as i64;
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = elapsed.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// Host name recorded on locally created events
pub fn local_host() -> &'static str {
    static HOST: OnceLock<String> = OnceLock::new();
    HOST.get_or_init(|| std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()))
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
