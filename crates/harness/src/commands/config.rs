//! Config command - show the effective configuration.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only list the config files consulted
    #[arg(long)]
    pub sources: bool,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    println!("# Config file search order (later overrides earlier)");
    for layer in &loaded.layers {
        let status = if layer.loaded { "loaded" } else { "not loaded" };
        println!("#   {} ({})", layer.path.display(), status);
    }
    for warning in &loaded.warnings {
        println!("#   warning: {}", warning);
    }

    if args.sources {
        return Ok(());
    }

    // Fill every section so defaults are visible.
    let config = &loaded.config;
    let effective = harness_config::HarnessConfig {
        server: Some(config.server()),
        invoker: Some(ctx.invoker_config()),
        backends: Some(harness_config::BackendsConfig {
            tasks: Some(config.backends().tasks()),
            memory: Some(config.backends().memory()),
        }),
        logging: Some(config.logging()),
    };

    println!();
    print!("{}", effective.to_toml()?);
    Ok(())
}
