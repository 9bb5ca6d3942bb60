//! Agent harness tool server
//!
//! Main entry point for the `harness` CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use harness_config::{HarnessConfig, LoadedConfig, LoggingConfig};

mod commands;

use commands::{config, serve, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Agent harness tool server - exposes task and memory tools over MCP stdio
#[derive(Parser)]
#[command(name = "harness")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Load configuration from this file only (skips discovery)
    #[arg(long, global = true, env = "HARNESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project directory for harness.toml and backend scripts
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the tool catalog over stdin/stdout (default)
    Serve(serve::ServeArgs),

    /// Print the tool catalog
    Tools(tools::ToolsArgs),

    /// Print the effective configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli)?;
    let logging = loaded.config.logging();
    let _guard = init_tracing(&logging, cli.verbose);

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    for path in loaded.loaded_paths() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }

    let ctx = commands::Context {
        loaded,
        project_dir: cli.project_dir,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Serve(args)) => serve::run(args, &ctx).await,
        Some(Commands::Tools(args)) => tools::run(args, &ctx).await,
        Some(Commands::Config(args)) => config::run(args, &ctx).await,
        None => serve::run(serve::ServeArgs::default(), &ctx).await,
    }
}

/// Load layered config, or a single file when `--config` is given.
fn load_config(cli: &Cli) -> Result<LoadedConfig> {
    if let Some(ref path) = cli.config {
        let config: HarnessConfig = harness_config::load_config_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        return Ok(LoadedConfig {
            config,
            layers: vec![harness_config::ConfigLayer {
                path: path.clone(),
                loaded: true,
            }],
            warnings: Vec::new(),
        });
    }

    Ok(harness_config::load_config(cli.project_dir.as_deref()))
}

/// Initialize tracing: console on stderr plus an optional rotating JSON file.
///
/// Stdout carries the protocol, so nothing here may write to it.
fn init_tracing(logging: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let default_filter = match (&logging.level, verbose) {
        (_, true) => "harness=debug,harness_mcp=debug,harness_config=debug,info".to_string(),
        (Some(level), false) => level.clone(),
        (None, false) => "harness=info,harness_mcp=info,warn".to_string(),
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let log_dir = logging.dir.clone().or_else(|| {
        harness_config::user_config_dir().map(|d| d.join("logs"))
    });

    let appender = match log_dir.filter(|_| logging.file) {
        Some(dir) => RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("harness.log")
            .build(&dir)
            .map_err(|e| (dir, e)),
        None => {
            tracing_subscriber::registry().with(console).init();
            return None;
        }
    };

    match appender {
        Ok(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_filter(EnvFilter::new(
                            "harness=trace,harness_mcp=trace,harness_config=trace,info",
                        )),
                )
                .init();
            Some(guard)
        }
        Err((dir, e)) => {
            tracing_subscriber::registry().with(console).init();
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "file logging disabled, cannot open log directory"
            );
            None
        }
    }
}
