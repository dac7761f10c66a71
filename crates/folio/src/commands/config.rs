//! Config command - inspect the resolved configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use folio_config::FolioConfig;

use super::Context;
use crate::presenter;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration, defaults included
    Show,

    /// Show which config files are searched and loaded
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = redact(ctx.config().effective());

    if ctx.json_output {
        return presenter::print_json(&config);
    }

    let sources = ctx.loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        for source in &sources {
            println!("# from {}", source.display());
        }
    }
    for warning in &ctx.loaded.warnings {
        println!("# warning: {}", warning);
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

#[derive(Serialize)]
struct PathReport<'a> {
    path: &'a std::path::Path,
    loaded: bool,
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let report: Vec<PathReport<'_>> = ctx
            .loaded
            .sources
            .iter()
            .map(|s| PathReport {
                path: &s.path,
                loaded: s.loaded,
            })
            .collect();
        return presenter::print_json(&report);
    }

    println!("Config file search order (later overrides earlier):\n");
    for source in &ctx.loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    println!();
    if let Some(dir) = folio_config::log_dir() {
        println!("Logs: {}", dir.display());
    }
    Ok(())
}

/// Hide API keys before printing.
fn redact(mut config: FolioConfig) -> FolioConfig {
    const MASK: &str = "********";
    if let Some(ref mut generator) = config.generator
        && generator.api_key.is_some()
    {
        generator.api_key = Some(MASK.to_string());
    }
    if let Some(ref mut embedding) = config.embedding
        && let Some(ref mut openai) = embedding.openai
        && openai.api_key.is_some()
    {
        openai.api_key = Some(MASK.to_string());
    }
    config
}
