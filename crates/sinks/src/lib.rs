// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-sinks: decorators and terminal sinks of the delivery pipeline
//!
//! - Reliability: insistent (backoff retry) and stubborn (reopen) append
//! - Shaping: batching, gzip and their inverses
//! - Rotation: the roll sink with its triggers and taggers
//! - Terminals: null, counter, file, acked RPC
//! - The chain-specification builder and stage registry

pub mod batch;
pub mod builder;
pub mod flakey;
pub mod gzip;
pub mod insistent;
pub mod roll;
pub mod rpc;
pub mod stubborn;
pub mod terminal;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use batch::{Batching, Unbatching};
pub use builder::{parse_chain, Registry, StageSpec};
pub use flakey::IntervalFlakey;
pub use gzip::{Gunzip, Gzip};
pub use insistent::InsistentAppend;
pub use roll::{RollSink, ROLL_TAG};
pub use rpc::{AckStatus, AckedSink, AckedTransport};
pub use stubborn::StubbornAppend;
pub use terminal::{CounterSink, FileSink, NullSink};
