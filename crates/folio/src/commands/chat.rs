//! Chat command - keyword matcher REPL.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::repl::Repl;
use crate::engines;

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Seed for randomly picked answers
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Run the chat command (REPL).
pub fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let matcher = engines::build_matcher(ctx.config(), args.seed)?;
    let mut repl = Repl::new(matcher, ctx.json_output)?;
    repl.run()
}
