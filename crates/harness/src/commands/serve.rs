//! Serve command - run the MCP protocol loop on stdio.

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use harness_mcp::{Backends, McpServer, ProcessInvoker, Registry, ServerOptions};

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Override the backend process timeout (seconds)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    let invoker_config = ctx.invoker_config();
    let timeout_secs = args.timeout_secs.unwrap_or(invoker_config.timeout_secs);
    let invoker = ProcessInvoker::from_config(&invoker_config)
        .with_timeout(Duration::from_secs(timeout_secs));

    let registry = Registry::builtin();
    let backends = Backends::from_config(&config.backends(), &invoker_config);
    let server = McpServer::new(&registry, backends, invoker)
        .with_options(ServerOptions::from_config(&config.server()));

    info!(
        working_dir = ?invoker_config.working_dir,
        timeout_secs,
        "starting stdio server"
    );

    server
        .serve_stdio()
        .await
        .context("MCP server stopped on a stream error")
}
