// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Roll triggers
//!
//! A trigger is armed after `reset`, reports `is_triggered` once its
//! condition holds, and names the current epoch through its tagger.

use super::tagger::Tagger;
use relay_core::{Clock, Event};
use std::time::{Duration, Instant};

pub trait RollTrigger: Send + Sync {
    fn is_triggered(&self) -> bool;

    /// Observe an event forwarded in the current epoch
    fn append(&mut self, _event: &Event) {}

    /// Re-arm and start a new epoch tag
    fn reset(&mut self);

    fn tag(&self) -> &str;
}

/// Fires once `period` has elapsed since the last reset
pub struct TimeTrigger<C: Clock> {
    tagger: Box<dyn Tagger>,
    period: Duration,
    clock: C,
    last_reset: Instant,
}

impl<C: Clock> TimeTrigger<C> {
    pub fn new(tagger: Box<dyn Tagger>, period: Duration, clock: C) -> Self {
        let last_reset = clock.now();
        Self {
            tagger,
            period,
            clock,
            last_reset,
        }
    }
}

impl<C: Clock> RollTrigger for TimeTrigger<C> {
    fn is_triggered(&self) -> bool {
        self.clock.now().saturating_duration_since(self.last_reset) >= self.period
    }

    fn reset(&mut self) {
        self.last_reset = self.clock.now();
        self.tagger.new_tag();
    }

    fn tag(&self) -> &str {
        self.tagger.tag()
    }
}

/// Fires once the bodies forwarded this epoch reach `max_bytes`
pub struct SizeTrigger {
    tagger: Box<dyn Tagger>,
    max_bytes: u64,
    bytes: u64,
}

impl SizeTrigger {
    pub fn new(tagger: Box<dyn Tagger>, max_bytes: u64) -> Self {
        Self {
            tagger,
            max_bytes,
            bytes: 0,
        }
    }
}

impl RollTrigger for SizeTrigger {
    fn is_triggered(&self) -> bool {
        self.bytes >= self.max_bytes
    }

    fn append(&mut self, event: &Event) {
        self.bytes += event.body.len() as u64;
    }

    fn reset(&mut self) {
        self.bytes = 0;
        self.tagger.new_tag();
    }

    fn tag(&self) -> &str {
        self.tagger.tag()
    }
}

/// Fires when any member fires; resets all members together
pub struct AnyTrigger {
    tagger: Box<dyn Tagger>,
    triggers: Vec<Box<dyn RollTrigger>>,
}

impl AnyTrigger {
    pub fn new(tagger: Box<dyn Tagger>, triggers: Vec<Box<dyn RollTrigger>>) -> Self {
        Self { tagger, triggers }
    }
}

impl RollTrigger for AnyTrigger {
    fn is_triggered(&self) -> bool {
        self.triggers.iter().any(|t| t.is_triggered())
    }

    fn append(&mut self, event: &Event) {
        for t in &mut self.triggers {
            t.append(event);
        }
    }

    fn reset(&mut self) {
        for t in &mut self.triggers {
            t.reset();
        }
        self.tagger.new_tag();
    }

    fn tag(&self) -> &str {
        self.tagger.tag()
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
