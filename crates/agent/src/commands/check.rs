// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate a chain specification without running it

use crate::output::{self, OutputFormat};
use anyhow::Result;
use relay_core::{Context, EventSink, PipelineDefaults};
use relay_sinks::Registry;

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Chain specification, e.g. `insistentAppend => batch(100) => null`
    spec: String,

    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,
}

pub async fn handle(args: CheckArgs) -> Result<()> {
    let ctx = Context::new().with_defaults(PipelineDefaults::default());
    let sink = Registry::with_defaults().build(&ctx, &args.spec)?;
    output::print_report(&sink.report().await, args.format);
    Ok(())
}
