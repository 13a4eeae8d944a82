// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build and execution context shared by the stages of one pipeline
//!
//! Carries the cooperative cancellation token, the argument defaults, and the
//! builder used by stages that construct sub-pipelines from specifications.

use crate::config::PipelineDefaults;
use crate::error::SpecError;
use crate::sink::EventSink;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Turns a specification string into a ready-to-open sink graph
pub trait SinkBuilder: Send + Sync {
    fn build_sink(&self, ctx: &Context, spec: &str) -> Result<Box<dyn EventSink>, SpecError>;
}

#[derive(Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    defaults: Arc<PipelineDefaults>,
    builder: Option<Arc<dyn SinkBuilder>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self, defaults: PipelineDefaults) -> Self {
        self.defaults = Arc::new(defaults);
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn SinkBuilder>) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A context whose token is cancelled with this one but can also be
    /// cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            defaults: Arc::clone(&self.defaults),
            builder: self.builder.clone(),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn defaults(&self) -> &PipelineDefaults {
        &self.defaults
    }

    pub fn builder(&self) -> Result<Arc<dyn SinkBuilder>, SpecError> {
        self.builder.clone().ok_or(SpecError::NoBuilder)
    }

    /// Build a sink through the context's builder
    pub fn build_sink(&self, spec: &str) -> Result<Box<dyn EventSink>, SpecError> {
        self.builder()?.build_sink(self, spec)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("defaults", &self.defaults)
            .field("builder", &self.builder.is_some())
            .finish()
    }
}
