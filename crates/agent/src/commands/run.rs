// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run the agent: stdin → WAL → forwarding chain
//!
//! Lines read from stdin become events appended to a roll sink whose epochs
//! are WAL files. Each finished file is picked up by a WAL source and pushed
//! through the configured chain. On end of input the last file is handed off
//! and drained before exit; on Ctrl-C, or when the forwarding chain fails,
//! everything stops where it is and undelivered files stay in the WAL for
//! the next run.

use crate::config::AgentConfig;
use crate::output::{self, OutputFormat};
use crate::pump;
use anyhow::{Context as _, Result};
use relay_core::{Context, EventSink, EventSource, Report};
use relay_sinks::builder::arity;
use relay_sinks::{Registry, RollSink};
use relay_storage::{WalManager, WalSink, WalSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(clap::Args)]
pub struct RunArgs {
    /// Agent configuration file
    #[arg(long, short, default_value = "relay.toml")]
    config: PathBuf,

    /// Print the forwarding chain's metrics on exit
    #[arg(long, value_enum)]
    report: Option<OutputFormat>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub ingested: u64,
    pub forwarded: u64,
    pub report: Report,
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let config = AgentConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let _log_guard = crate::setup_logging(&config.agent.log_level, config.agent.log_file.as_deref())?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            interrupt.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let summary = run(&config, stdin, cancel).await?;
    println!(
        "ingested {} events, forwarded {} events",
        summary.ingested, summary.forwarded
    );
    if let Some(format) = args.report {
        output::print_report(&summary.report, format);
    }
    Ok(())
}

/// Stage registry with the `wal` terminal bound to `manager`
pub fn registry(manager: &Arc<WalManager>, prefix: &str) -> Registry {
    let mut registry = Registry::with_defaults();
    let manager = Arc::clone(manager);
    let prefix = prefix.to_string();
    registry.register_sink("wal", move |_, args| {
        arity("wal", args, 0, 0, "wal")?;
        Ok(Box::new(WalSink::new(Arc::clone(&manager), prefix.clone())))
    });
    registry
}

pub async fn run<R>(config: &AgentConfig, input: R, cancel: CancellationToken) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
{
    let manager = Arc::new(
        WalManager::open(&config.wal.dir)
            .with_context(|| format!("opening wal at {}", config.wal.dir.display()))?,
    );
    let moved = manager.recover()?;
    if !moved.is_empty() {
        info!(files = moved.len(), "requeued wal files left by an earlier run");
    }

    let registry = registry(&manager, &config.agent.name);
    let ctx = Context::new()
        .with_defaults(config.defaults.clone())
        .with_cancel(cancel.clone())
        .with_builder(Arc::new(registry.clone()));

    let mut forward = registry
        .build(&ctx, &config.pipeline.sink)
        .with_context(|| format!("building pipeline '{}'", config.pipeline.sink))?;
    let mut ingest = RollSink::periodic(
        &ctx,
        "wal",
        config.wal.roll_period,
        ctx.defaults().roll_check_period,
    )?;
    let mut source = WalSource::new(&ctx, Arc::clone(&manager));
    let stop = source.stop_handle();

    forward.open().await?;
    source.open().await?;
    ingest.open().await?;
    info!(
        sink = %config.pipeline.sink,
        roll = %humantime::format_duration(config.wal.roll_period),
        wal = %manager.base().display(),
        "agent running",
    );

    // a forwarding failure also ends ingest
    let halt = cancel.child_token();
    let forwarder = {
        let halt = halt.clone();
        tokio::spawn(async move {
            let result = pump::forward(&mut source, &mut forward).await;
            if let Err(e) = &result {
                error!(error = %e, "forwarding failed, stopping ingest");
                halt.cancel();
            }
            (source, forward, result)
        })
    };

    let ingested = pump::ingest(input, &mut ingest, &halt).await;
    // hands the last file to the source
    let ingest_closed = ingest.close().await;
    stop.cancel();

    let (mut source, mut forward, forwarded) = forwarder.await?;
    if let Err(e) = source.close().await {
        warn!(error = %e, "closing wal source");
    }
    let forward_closed = forward.close().await;
    let report = forward.report().await;

    let ingested = ingested?;
    ingest_closed?;
    let forwarded = forwarded?;
    match forward_closed {
        Err(e) if cancel.is_cancelled() => warn!(error = %e, "pipeline close after interrupt"),
        other => other?,
    }
    info!(ingested, forwarded, "agent stopped");
    Ok(RunSummary {
        ingested,
        forwarded,
        report,
    })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
