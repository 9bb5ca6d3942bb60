//! Tools command - print the tool catalog.

use anyhow::Result;
use clap::Args;

use harness_mcp::{Binding, Registry, ToolDescriptor};

use super::Context;

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Print the catalog as a `tools/list` result
    #[arg(long)]
    pub json: bool,
}

/// Run the tools command.
pub async fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let registry = Registry::builtin();

    if args.json {
        let result = harness_mcp::ListToolsResult {
            tools: registry.tool_infos(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} tools:\n", registry.len());
    for tool in registry.tools() {
        println!("  {:<14} {}", tool.name.as_str(), tool.description);
        if ctx.verbose {
            println!("  {:<14} usage: {}", "", usage(tool));
        }
    }

    Ok(())
}

/// One-line command usage for a tool, as the backend sees it.
fn usage(tool: &ToolDescriptor) -> String {
    let mut parts = vec![tool.backend.to_string()];
    parts.extend(tool.subcommand.iter().map(|s| s.to_string()));
    for prop in tool.properties {
        match prop.binding {
            Binding::Positional => parts.push(format!("<{}>", prop.name)),
            Binding::Flag(flag) if prop.required => parts.push(format!("{} <{}>", flag, prop.name)),
            Binding::Flag(flag) => parts.push(format!("[{} <{}>]", flag, prop.name)),
        }
    }
    parts.join(" ")
}
