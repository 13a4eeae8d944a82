// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError};
use std::sync::{Arc, Mutex};

/// Recorded sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Open,
    Append { body: Vec<u8> },
    Close,
}

#[derive(Debug, Default)]
struct FakeSinkState {
    calls: Vec<SinkCall>,
    events: Vec<Event>,
    open: bool,
    fail_appends: u32,
    fail_opens: u32,
    fail_closes: u32,
    always_fail: bool,
}

/// Scriptable in-memory sink
///
/// Clones share state, so a test keeps one handle and hands a clone to the
/// stage under test.
#[derive(Clone, Default)]
pub struct FakeSink {
    state: Arc<Mutex<FakeSinkState>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeSinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the next `n` appends
    pub fn fail_next_appends(&self, n: u32) -> &Self {
        self.lock().fail_appends = n;
        self
    }

    /// Fail the next `n` opens
    pub fn fail_next_opens(&self, n: u32) -> &Self {
        self.lock().fail_opens = n;
        self
    }

    /// Fail the next `n` closes (the sink still ends up closed)
    pub fn fail_next_closes(&self, n: u32) -> &Self {
        self.lock().fail_closes = n;
        self
    }

    /// Fail every append from now on
    pub fn fail_always(&self) -> &Self {
        self.lock().always_fail = true;
        self
    }

    pub fn heal(&self) -> &Self {
        let mut state = self.lock();
        state.always_fail = false;
        state.fail_appends = 0;
        state.fail_opens = 0;
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SinkCall> {
        self.lock().calls.clone()
    }

    /// Events accepted so far
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Open))
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Close))
    }

    pub fn append_count(&self) -> usize {
        self.count(|c| matches!(c, SinkCall::Append { .. }))
    }

    fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl EventSink for FakeSink {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Open);
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(SinkError::Failed("scripted open failure".to_string()));
        }
        state.open = true;
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Append {
            body: event.body.clone(),
        });
        if !state.open {
            return Err(SinkError::NotOpen("Fake".to_string()));
        }
        if state.always_fail {
            return Err(SinkError::Failed("scripted append failure".to_string()));
        }
        if state.fail_appends > 0 {
            state.fail_appends -= 1;
            return Err(SinkError::Failed("scripted append failure".to_string()));
        }
        state.events.push(event);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.calls.push(SinkCall::Close);
        state.open = false;
        if state.fail_closes > 0 {
            state.fail_closes -= 1;
            return Err(SinkError::Failed("scripted close failure".to_string()));
        }
        Ok(())
    }

    async fn report(&self) -> Report {
        let state = self.lock();
        Report::new("Fake").with_long("appended", state.events.len() as i64)
    }
}
