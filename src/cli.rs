//! CLI definitions for Taskline.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Taskline CLI.
#[derive(Parser)]
#[command(name = "taskline")]
#[command(about = "Serialized in-process task queue runner")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Dispatch a synthetic batch of tasks and print a JSON summary
    Run {
        /// Number of tasks
        #[arg(long, default_value_t = 10)]
        tasks: u64,

        /// Every Nth task always fails (0 = never)
        #[arg(long, default_value_t = 0)]
        fail_every: u64,

        /// Every Nth task fails on its first attempt only (0 = never)
        #[arg(long, default_value_t = 0)]
        flaky_every: u64,

        /// Every Nth task is fire-and-forget (0 = never)
        #[arg(long, default_value_t = 0)]
        detach_every: u64,

        /// Retry limit per task (defaults to queue.default_retry_limit)
        #[arg(long)]
        retries: Option<u32>,

        /// Simulated work per attempt, in milliseconds
        #[arg(long, default_value_t = 0)]
        work_ms: u64,
    },

    /// Validate the configuration file
    CheckConfig,
}
