// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-core: foundation of the relay delivery pipeline
//!
//! This crate provides:
//! - The event record passed between pipeline stages
//! - Sink/source stage traits and the decorator forwarding helper
//! - Backoff policies used by retrying decorators
//! - Metrics report trees and the error taxonomy
//! - Build context (cancellation, defaults, sink builder seam)

pub mod backoff;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod report;
pub mod sink;
pub mod source;

// Re-exports
pub use backoff::{
    BackoffPolicy, CappedExponentialBackoff, Cancelled, CumulativeCappedExponentialBackoff,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, PipelineDefaults};
pub use context::{Context, SinkBuilder};
pub use error::{RetryHistory, SinkError, SourceError, SpecError};
pub use event::{Event, Priority};
pub use report::Report;
pub use sink::{EventSink, Wrapped};
pub use source::EventSource;
