//! CLI command handlers.

pub mod ask;
pub mod chat;
pub mod config;
pub mod rag;
pub mod repl;

use folio_config::{FolioConfig, LoadedConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    pub fn config(&self) -> &FolioConfig {
        &self.loaded.config
    }
}
