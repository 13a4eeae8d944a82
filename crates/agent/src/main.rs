// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! relay-agent: durable event forwarding
//!
//! Events are written to a local WAL before they are sent anywhere, so a
//! crash or an unreachable collector never loses what was accepted.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod config;
mod output;
mod pump;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use commands::{check, run, wal};
use std::path::Path;

#[derive(Parser)]
#[command(
    name = "relay-agent",
    version,
    about = "Relay agent - write-ahead logged event forwarding"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read events from stdin and forward them through the WAL
    Run(run::RunArgs),
    /// WAL directory maintenance
    Wal(wal::WalArgs),
    /// Build a chain specification and print its metrics tree
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // run configures logging from its own config file
        Commands::Run(args) => run::handle(args).await,
        Commands::Wal(args) => {
            let _guard = setup_logging("warn", None)?;
            wal::handle(args)
        }
        Commands::Check(args) => {
            let _guard = setup_logging("warn", None)?;
            check::handle(args).await
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level`. With a file,
/// output goes through a non-blocking appender whose guard must be held
/// until exit.
pub(crate) fn setup_logging(
    level: &str,
    file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(path) = file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
        return Ok(None);
    };

    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("log file has no directory: {}", path.display()))?;
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file has no name: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()?;
    Ok(Some(guard))
}
