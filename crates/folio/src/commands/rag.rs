//! Rag command - questions to the semantic retriever.

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use folio_retrieval::{CACHE_KEY, Document, PipelineStatus, SemanticRetriever};
use folio_session::SessionStore;

use super::Context;
use crate::{engines, presenter};

/// Arguments for the rag command.
#[derive(Args, Debug)]
pub struct RagArgs {
    /// Question to answer; omit to start a REPL
    pub question: Vec<String>,
}

/// Run the rag command.
pub async fn run(args: RagArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config();
    let session = SessionStore::new(engines::store_config(&config.session()));
    let documents = engines::documents(config)?;
    let mut retriever = engines::build_retriever(config, session.clone())?;

    initialize(&mut retriever, &documents, &session).await?;

    if args.question.is_empty() {
        return repl(&mut retriever, &documents, &session, ctx).await;
    }

    let answer = retriever.respond(&args.question.join(" ")).await;
    if ctx.json_output {
        presenter::print_json(&answer)
    } else {
        presenter::print_answer(&answer, ctx.verbose);
        Ok(())
    }
}

async fn initialize(
    retriever: &mut SemanticRetriever,
    documents: &[Document],
    session: &SessionStore,
) -> Result<()> {
    let cached = session.contains(CACHE_KEY).await;
    let started = Instant::now();
    let mut reporter = StatusReporter::new();

    let result = retriever
        .init(documents.to_vec(), |status| reporter.update(status))
        .await;
    reporter.finish();

    let mode = result.context("initializing semantic retriever")?;
    eprintln!(
        "{}",
        style(format!(
            "Ready in {:.0}ms ({} documents, {} mode{})",
            started.elapsed().as_secs_f64() * 1000.0,
            documents.len(),
            mode,
            if cached { ", index from session cache" } else { "" }
        ))
        .dim()
    );
    Ok(())
}

async fn repl(
    retriever: &mut SemanticRetriever,
    documents: &[Document],
    session: &SessionStore,
    ctx: &Context,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    presenter::print_dim("Ask about the portfolio. /help for commands, Ctrl+D to exit.");

    loop {
        let line = match editor.readline(&format!("{} ", style("rag>").magenta().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                presenter::print_dim("(Interrupted - type /quit to exit)");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                presenter::print_error(&format!("Input error: {}", e));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        match line {
            "/quit" | "/q" | "/exit" => break,
            "/help" | "/h" | "/?" => {
                println!("  {}     - Exit", style("/quit").cyan());
                println!("  {}  - Rebuild the index (cached per session)", style("/reindex").cyan());
                println!("  {}   - Show pipeline and session cache state", style("/status").cyan());
            }
            "/reindex" => {
                if let Err(e) = initialize(retriever, documents, session).await {
                    presenter::print_error(&format!("{:#}", e));
                }
            }
            "/status" => {
                let stats = session.stats().await;
                println!("Pipeline: {}", retriever.status());
                println!(
                    "Session cache: {} entries, {} / {} bytes",
                    stats.entries, stats.bytes, stats.max_bytes
                );
            }
            cmd if cmd.starts_with('/') => {
                presenter::print_error(&format!("Unknown command: {}", cmd));
            }
            question => {
                let answer = retriever.respond(question).await;
                if ctx.json_output {
                    presenter::print_json(&answer)?;
                } else {
                    println!();
                    presenter::print_answer(&answer, ctx.verbose);
                    println!();
                }
            }
        }
    }

    presenter::print_dim("Goodbye!");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Status Reporting
// ─────────────────────────────────────────────────────────────────────────────

/// Shows init progress on stderr: a spinner on a terminal, plain lines
/// otherwise.
enum StatusReporter {
    Spinner(ProgressBar),
    Lines,
}

impl StatusReporter {
    fn new() -> Self {
        if !Term::stderr().is_term() {
            return Self::Lines;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(template);
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::Spinner(bar)
    }

    fn update(&mut self, status: PipelineStatus) {
        match self {
            Self::Spinner(bar) => bar.set_message(status.to_string()),
            Self::Lines => {
                if is_endpoint(&status) {
                    eprintln!("{}", status);
                }
            }
        }
    }

    fn finish(self) {
        if let Self::Spinner(bar) = self {
            bar.finish_and_clear();
        }
    }
}

/// Per-document and per-chunk progress would flood a log; keep the endpoints.
fn is_endpoint(status: &PipelineStatus) -> bool {
    match *status {
        PipelineStatus::Indexing { done, total } => done == 0 || done == total,
        PipelineStatus::DownloadingModel {
            received, total, ..
        } => received == 0 || Some(received) == total,
        _ => true,
    }
}
