// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for pipeline stages
//!
//! - [`SpecError`]: malformed specification, raised at build time, never retried
//! - [`SinkError`] / [`SourceError`]: runtime failures of a stage
//! - [`RetryHistory`]: ordered causes collected by retrying decorators

use std::fmt;
use thiserror::Error;

/// Errors raised while turning a specification into a stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("empty specification")]
    Empty,
    #[error("parse error at offset {offset}: {reason}")]
    Parse { offset: usize, reason: String },
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("'{0}' cannot terminate a pipeline")]
    NotASink(String),
    #[error("'{0}' cannot decorate another stage")]
    NotADecorator(String),
    #[error("usage: {0}")]
    Usage(String),
    #[error("invalid argument '{value}' for {stage}: {reason}")]
    InvalidArgument {
        stage: String,
        value: String,
        reason: String,
    },
    #[error("no sink builder in context")]
    NoBuilder,
}

/// Ordered history of failed attempts, oldest first
#[derive(Debug, Default)]
pub struct RetryHistory {
    pub causes: Vec<SinkError>,
}

impl RetryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cause: SinkError) {
        self.causes.push(cause);
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }
}

impl fmt::Display for RetryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed attempt(s)", self.causes.len())?;
        for (i, cause) in self.causes.iter().enumerate() {
            write!(f, "; [{}] {}", i + 1, cause)?;
        }
        Ok(())
    }
}

/// Errors from sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{0} is not open")]
    NotOpen(String),
    #[error("{0} is already open")]
    AlreadyOpen(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("{0}")]
    Failed(String),
    #[error("event dropped downstream: {0}")]
    Dropped(String),
    #[error("gave up after {0}")]
    Exhausted(RetryHistory),
    #[error("interrupted after {0}")]
    Interrupted(RetryHistory),
    #[error("spec error: {0}")]
    Spec(#[from] SpecError),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SinkError {
    /// Cancellation observed with no prior failures
    pub fn interrupted() -> Self {
        SinkError::Interrupted(RetryHistory::new())
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, SinkError::Interrupted(_))
    }
}

/// Errors from source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} is not open")]
    NotOpen(String),
    #[error("{0} is already open")]
    AlreadyOpen(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("interrupted")]
    Interrupted,
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}
