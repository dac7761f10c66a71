//! Folio - ask questions about a portfolio from the terminal.
//!
//! Main entry point for the folio CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;
mod engines;
mod presenter;

use commands::{ask, chat, config, rag};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Folio - a portfolio assistant with keyword and semantic answer engines
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Load this config file instead of discovering one
    #[arg(long, global = true, env = "FOLIO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask the keyword assistant a one-shot question
    Ask(ask::AskArgs),

    /// Chat with the keyword assistant (REPL)
    Chat(chat::ChatArgs),

    /// Ask the semantic retriever (one question, or a REPL)
    Rag(rag::RagArgs),

    /// Configuration inspection
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(cli.verbose);

    let loaded = match cli.config {
        Some(ref path) => folio_config::load_explicit(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => folio_config::load_config(None).context("discovering config files")?,
    };
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "Configuration loaded");

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Ask(args) => ask::run(args, &ctx),
        Commands::Chat(args) => chat::run(args, &ctx),
        Commands::Rag(args) => rag::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx),
    }
}

/// Console (human-readable, stderr) plus a daily-rotated JSON file.
///
/// The returned guard flushes the file writer on drop. When the log
/// directory cannot be created only the console layer is installed.
fn init_tracing(verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "folio=debug,folio_matcher=debug,folio_retrieval=debug,folio_llm=debug,folio_session=debug,folio_config=debug,info"
    } else {
        "folio=info,folio_matcher=info,folio_retrieval=info,folio_llm=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let log_dir = folio_config::log_dir().unwrap_or_else(|| PathBuf::from("logs"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("folio.log")
        .build(&log_dir)
        .ok();
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(
                    "folio=trace,folio_matcher=trace,folio_retrieval=trace,folio_llm=trace,folio_session=trace,folio_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
