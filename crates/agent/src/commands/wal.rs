// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL directory maintenance

use crate::output::{self, OutputFormat};
use anyhow::Result;
use clap::Subcommand;
use relay_storage::WalManager;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub struct WalArgs {
    #[command(subcommand)]
    command: WalCommand,
}

#[derive(Subcommand)]
pub enum WalCommand {
    /// Count files in each state
    Status {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Return files left in writing/sending by a crash to logged
    Recover {
        #[arg(long)]
        dir: PathBuf,
    },
    /// Requeue quarantined files for another delivery attempt
    Retry {
        #[arg(long)]
        dir: PathBuf,
    },
}

pub fn handle(args: WalArgs) -> Result<()> {
    match args.command {
        WalCommand::Status { dir, format } => {
            let counts = WalManager::open(dir)?.state_counts()?;
            output::print(&counts, format);
        }
        WalCommand::Recover { dir } => {
            let moved = WalManager::open(dir)?.recover()?;
            info!(files = moved.len(), "recovery done");
            output::print_list(&moved, OutputFormat::Text);
        }
        WalCommand::Retry { dir } => {
            let requeued = WalManager::open(dir)?.retry_errors()?;
            output::print_list(&requeued, OutputFormat::Text);
        }
    }
    Ok(())
}
