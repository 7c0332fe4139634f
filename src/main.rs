//! Taskline command-line runner.

mod cli;
mod runner;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskline_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use taskline_queue::Queue;

use crate::cli::{Cli, Commands};
use crate::runner::RunPlan;

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize tracing with console output and optional rolling file output.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        // An unusable level is reported by the validator, not here.
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("taskline")
                .filename_suffix("log")
                .max_log_files(7)
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    // Logs go to stderr; stdout carries the command output.
    let json_layer = logging
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!logging.json).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Run {
            tasks,
            fail_every,
            flaky_every,
            detach_every,
            retries,
            work_ms,
        } => {
            let plan = RunPlan {
                tasks,
                fail_every,
                flaky_every,
                detach_every,
                retries,
                work: Duration::from_millis(work_ms),
            };
            run_batch(config, plan).await
        }
        Commands::CheckConfig => check_config(&config, cli.config.as_deref()),
    }
}

async fn run_batch(config: Config, plan: RunPlan) -> anyhow::Result<()> {
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!(path = %warning.path, "{}", warning.message);
    }

    let queue: Queue<u64> = Queue::with_config(config.queue.clone())?;
    let observed = runner::observe(&queue, &config.events);
    info!(observed, "Queue ready");

    let summary = runner::run(&queue, &plan).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn check_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    let source = path.map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string());
    let result = ConfigValidator::validate(config);

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        bail!("{} has {} error(s)", source, result.errors.len());
    }
    println!("{} is valid", source);
    Ok(())
}
