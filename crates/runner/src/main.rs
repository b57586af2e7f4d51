// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ACP Slice Runner (acp-slice)
//!
//! Polls `queue/tasks.jsonl` under a runtime root and drives each
//! `QUEUED` task through evaluation, harness execution, retry, and
//! terminal validation.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod consistency;
mod harness;
mod paths;
mod pipeline;
mod replay;
mod resolve;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use oj_core::{Clock, SystemClock};

use crate::paths::RuntimeRoot;
use crate::pipeline::Runner;

#[derive(Parser, Debug)]
#[command(
    name = "acp-slice",
    version,
    about = "Queue runner for ACP slice tasks"
)]
struct Cli {
    /// Override the runtime root directory (defaults to
    /// ACP_SLICE_RUNTIME_ROOT, or ./.acp-slice if that is unset).
    #[arg(long, value_name = "PATH")]
    runtime_root: Option<PathBuf>,

    /// Poll the queue forever instead of processing a single pass.
    /// Accepts an optional poll interval in seconds (default 2.0).
    #[arg(
        long = "loop",
        value_name = "INTERVAL_SECONDS",
        num_args = 0..=1,
        default_missing_value = "2.0"
    )]
    loop_interval: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let runtime_root = RuntimeRoot::resolve(cli.runtime_root);
    tracing::info!(root = %runtime_root.path().display(), "resolved runtime root");
    let runner = Runner::new(runtime_root, SystemClock)?;
    tracing::info!(run_id = %runner.run_id(), "acp-slice starting");

    match cli.loop_interval {
        Some(interval) => run_forever(&runner, Duration::from_secs_f64(interval)).await,
        None => {
            let processed = runner.run_once().await?;
            tracing::info!(processed, "run complete");
            Ok(())
        }
    }
}

/// Mirrors the reference implementation's `run_forever`: process a pass,
/// sleep for the poll interval, repeat, until interrupted.
async fn run_forever<C: Clock>(runner: &Runner<C>, interval: Duration) -> anyhow::Result<()> {
    loop {
        let processed = runner.run_once().await?;
        tracing::debug!(processed, "pass complete");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received ctrl-c, shutting down");
                return Ok(());
            }
        }
    }
}
