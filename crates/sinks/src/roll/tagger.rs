// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Epoch taggers

use chrono::{DateTime, Local, TimeZone};
use relay_core::event::local_host;
use relay_core::{Clock, SystemClock};
use std::sync::atomic::{AtomicU64, Ordering};

/// Names the currently open roll epoch
pub trait Tagger: Send + Sync {
    /// Start a new epoch and return its tag
    fn new_tag(&mut self) -> &str;

    fn tag(&self) -> &str;
}

static TAG_SEQ: AtomicU64 = AtomicU64::new(0);

/// `<host>-<yyyyMMdd-HHmmssSSS><offset>.<sequence>`
///
/// The sequence is shared by every tagger in the process, so two taggers
/// started in the same millisecond still disagree.
pub struct ProcessTagger<C: Clock = SystemClock> {
    clock: C,
    host: String,
    tag: String,
}

impl ProcessTagger<SystemClock> {
    pub fn system() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> ProcessTagger<C> {
    pub fn new(clock: C) -> Self {
        Self::with_host(clock, local_host())
    }

    pub fn with_host(clock: C, host: impl Into<String>) -> Self {
        let mut tagger = Self {
            clock,
            host: host.into(),
            tag: String::new(),
        };
        tagger.new_tag();
        tagger
    }
}

impl<C: Clock> Tagger for ProcessTagger<C> {
    fn new_tag(&mut self) -> &str {
        let millis = self.clock.unix_millis();
        let seq = TAG_SEQ.fetch_add(1, Ordering::Relaxed);
        self.tag = match Local.timestamp_millis_opt(millis).single() {
            Some(at) => format_tag(&self.host, &at, seq),
            None => format!("{}-{millis}.{seq}", self.host),
        };
        &self.tag
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

pub(crate) fn format_tag<Tz>(host: &str, at: &DateTime<Tz>, seq: u64) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{host}-{}.{seq}", at.format("%Y%m%d-%H%M%S%3f%z"))
}

#[cfg(test)]
#[path = "tagger_tests.rs"]
mod tests;
