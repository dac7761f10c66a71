//! Ask command - one-shot question to the keyword matcher.

use anyhow::Result;
use clap::Args;

use super::Context;
use crate::{engines, presenter};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Seed for randomly picked answers
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Run the ask command.
pub fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let mut matcher = engines::build_matcher(ctx.config(), args.seed)?;
    let question = args.question.join(" ");

    let result = matcher.find_answer(&question);
    tracing::debug!(kind = ?result.kind, topic = ?result.topic, "Answered");

    if ctx.json_output {
        presenter::print_json(&result)
    } else {
        presenter::print_match(&result);
        Ok(())
    }
}
