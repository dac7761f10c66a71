//! Interactive chat loop over the keyword matcher.

use anyhow::Result;
use console::{Style, Term, style};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use folio_matcher::{KeywordMatcher, MatchResult};

use crate::presenter;

/// REPL state.
///
/// The matcher lives as long as the loop, so conversation memory and pool
/// rotation carry across turns until `/reset`.
pub struct Repl {
    matcher: KeywordMatcher,
    editor: Editor<(), DefaultHistory>,
    term: Term,
    json_output: bool,
    /// Suggestions from the latest reply, for `/suggest N`.
    suggestions: Vec<String>,
}

impl Repl {
    pub fn new(matcher: KeywordMatcher, json_output: bool) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();

        let editor = Editor::with_config(config)?;

        Ok(Self {
            matcher,
            editor,
            term: Term::stdout(),
            json_output,
            suggestions: Vec::new(),
        })
    }

    /// Run the REPL loop.
    pub fn run(&mut self) -> Result<()> {
        self.print_welcome();

        loop {
            let prompt = format!("{} ", style("you>").cyan().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        match self.handle_slash_command(line) {
                            Ok(ControlFlow::Continue) => continue,
                            Ok(ControlFlow::Exit) => break,
                            Err(e) => {
                                presenter::print_error(&format!("Command error: {}", e));
                                continue;
                            }
                        }
                    }

                    self.send_message(line)?;
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    presenter::print_dim("(Interrupted - type /quit to exit)");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    presenter::print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        presenter::print_dim("Goodbye!");
        Ok(())
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        let result = self.matcher.find_answer(message);
        tracing::debug!(kind = ?result.kind, topic = ?result.topic, "Answered");
        self.show(&result)?;
        self.suggestions = result.suggestions;
        Ok(())
    }

    fn show(&self, result: &MatchResult) -> Result<()> {
        if self.json_output {
            return presenter::print_json(result);
        }
        println!();
        presenter::print_match(result);
        println!();
        Ok(())
    }

    fn handle_slash_command(&mut self, input: &str) -> Result<ControlFlow> {
        let parts: Vec<&str> = input[1..].split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        let args = parts.get(1..).unwrap_or_default();

        match cmd {
            "quit" | "q" | "exit" => return Ok(ControlFlow::Exit),
            "help" | "h" | "?" => self.print_help(),
            "clear" | "cls" => self.term.clear_screen()?,
            "reset" => {
                self.matcher.reset_memory();
                presenter::print_dim("Conversation memory cleared");
            }
            "suggest" | "s" => match args.first().and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n >= 1 && n <= self.suggestions.len() => {
                    let question = self.suggestions[n - 1].clone();
                    println!("{} {}", style("you>").cyan().bold(), question);
                    self.send_message(&question)?;
                }
                _ if self.suggestions.is_empty() => {
                    presenter::print_dim("No suggestions yet");
                }
                _ => presenter::print_error(&format!(
                    "Usage: /suggest N, with N from 1 to {}",
                    self.suggestions.len()
                )),
            },
            "" => presenter::print_dim("Type /help for available commands"),
            _ => {
                presenter::print_error(&format!("Unknown command: /{}", cmd));
                presenter::print_dim("Type /help for available commands");
            }
        }

        Ok(ControlFlow::Continue)
    }

    fn print_welcome(&mut self) {
        let greeting = self.matcher.knowledge().greeting().clone();
        let dim = Style::new().dim();

        if !self.json_output {
            println!();
            println!("{}", style("Folio Chat").bold().cyan());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!("{}", presenter::render_markup(&greeting.text));
            presenter::print_suggestions(&greeting.suggestions);
            println!();
            println!("{}", dim.apply_to("Use /help for commands, Ctrl+D to exit."));
            println!();
        }
        self.suggestions = greeting.suggestions;
    }

    fn print_help(&self) {
        let dim = Style::new().dim();
        println!();
        println!("{}", style("Available Commands").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!("  {}  - Exit the REPL", style("/quit, /q").cyan());
        println!("  {}  - Show this help", style("/help, /h, /?").cyan());
        println!("  {}  - Clear the screen", style("/clear").cyan());
        println!("  {}  - Forget topics already discussed", style("/reset").cyan());
        println!("  {}  - Ask suggestion N from the last reply", style("/suggest N").cyan());
        println!();
        println!("{}", dim.apply_to("Keyboard shortcuts:"));
        println!("  {} - Interrupt current input", dim.apply_to("Ctrl+C"));
        println!("  {} - Exit the REPL", dim.apply_to("Ctrl+D"));
        println!();
    }
}

/// Control flow for the REPL.
pub enum ControlFlow {
    Continue,
    Exit,
}
