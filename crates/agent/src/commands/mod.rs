// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent command implementations

pub mod check;
pub mod run;
pub mod wal;
