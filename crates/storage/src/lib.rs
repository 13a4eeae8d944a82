// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-storage: agent-side durability
//!
//! Events are written to checksummed, fsync'd log files before they are
//! forwarded, and replayed from those files after a crash.

pub mod wal;

pub use wal::{
    StateCounts, WalError, WalHeader, WalManager, WalReader, WalRecord, WalSink, WalSource,
    WalState, WalWriter,
};
