//! Configuration for the folio portfolio assistant.
//!
//! Provides TOML-based configuration with:
//! - One optional section per engine (`[matcher]`, `[retrieval]`,
//!   `[embedding]`, `[generator]`, `[session]`)
//! - File layering (user config dir + project-local `folio.toml`)
//! - API key resolution (env var, then config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigSource, LoadedConfig, PROJECT_CONFIG_FILE, config_dir, load_config,
    load_config_file, load_config_with_options, load_explicit, log_dir, save_config,
    user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, resolve_api_key};
pub use types::*;
