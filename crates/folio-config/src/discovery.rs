//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `$FOLIO_CONFIG_DIR/config.toml`, or the platform config dir
//!    (`~/.config/folio/config.toml` on Linux)
//! 2. `./folio.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, FolioConfig, Result};

/// Project-local config filename.
pub const PROJECT_CONFIG_FILE: &str = "folio.toml";

/// Config filename inside the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "folio";

/// Environment variable overriding the user config directory.
///
/// Takes precedence over the platform default. Tests point it at a temp dir.
pub const CONFIG_DIR_ENV: &str = "FOLIO_CONFIG_DIR";

/// Tracks where each config layer was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: FolioConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings raised while loading (malformed files, plaintext keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Discover and merge all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Discover and merge with explicit control over the user config directory.
///
/// `config_dir` overrides both `FOLIO_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = FolioConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    check_plaintext_keys(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load exactly one file, skipping discovery.
///
/// Unlike discovered layers, a broken explicit file is an error.
pub fn load_explicit(path: &Path) -> Result<LoadedConfig> {
    let config = load_config_file(path)?;
    let mut warnings = Vec::new();
    check_plaintext_keys(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        sources: vec![ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        }],
        warnings,
    })
}

/// Load config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<FolioConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    FolioConfig::from_toml(&contents)
}

/// Write configuration to a file, creating parent directories.
pub fn save_config(config: &FolioConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory: `FOLIO_CONFIG_DIR`, else the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Directory for rotated log files.
pub fn log_dir() -> Option<PathBuf> {
    config_dir().map(|d| d.join("logs"))
}

fn load_layer(config: &mut FolioConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    let mut source = ConfigSource {
        path: path.to_path_buf(),
        loaded: false,
    };
    if !path.is_file() {
        return source;
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            source.loaded = true;
        }
        Err(e) => warnings.push(format!("Failed to load {}: {}", path.display(), e)),
    }
    source
}

fn check_plaintext_keys(config: &FolioConfig, warnings: &mut Vec<String>) {
    if let Some(ref generator) = config.generator
        && generator.has_plaintext_api_key()
    {
        warnings.push(format!(
            "[generator] contains a plaintext API key. Consider setting {} instead.",
            generator.backend.env_var()
        ));
    }

    if let Some(ref embedding) = config.embedding
        && embedding.has_plaintext_api_key()
    {
        warnings.push(
            "[embedding.openai] contains a plaintext API key. Consider setting OPENAI_API_KEY instead."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    use crate::EmbeddingProvider;

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/folio.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert!(loaded.config.matcher.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_project_overrides_user_layer() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            r#"
[embedding]
provider = "mock"

[retrieval]
top_k = 5
"#,
        )
        .unwrap();
        fs::write(
            project.path().join("folio.toml"),
            r#"
[retrieval]
top_k = 2
"#,
        )
        .unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert_eq!(loaded.config.retrieval().top_k, 2);
        assert_eq!(loaded.config.embedding().provider, EmbeddingProvider::Mock);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_malformed_layer_warns_but_continues() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[retrieval]\ntop_k = 9\n").unwrap();
        fs::write(project.path().join("folio.toml"), "not valid {{{{").unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path())).unwrap();

        assert_eq!(loaded.config.retrieval().top_k, 9);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("folio.toml"));
        assert!(!loaded.sources[1].loaded);
    }

    #[test]
    fn test_plaintext_key_warnings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folio.toml");
        fs::write(
            &path,
            r#"
[generator]
backend = "openai"
api_key = "sk-secret"

[embedding.openai]
api_key = "sk-secret"
"#,
        )
        .unwrap();

        let loaded = load_explicit(&path).unwrap();
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("OPENAI_API_KEY"));
        assert!(loaded.warnings[1].contains("[embedding.openai]"));
    }

    #[test]
    fn test_explicit_file_errors_are_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[matcher]\nfusion_ratio = 2.0\n").unwrap();

        assert!(load_explicit(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = FolioConfig::new();
        config.session = Some(crate::SessionSection {
            ttl_secs: 30,
            ..Default::default()
        });

        save_config(&config, &path).unwrap();

        assert_eq!(load_config_file(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: serialized with every other env-touching test.
        unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };
        let resolved = config_dir();
        let logs = log_dir();
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };

        assert_eq!(resolved.as_deref(), Some(dir.path()));
        assert_eq!(logs, Some(dir.path().join("logs")));
    }

    #[test]
    #[serial]
    fn test_platform_default_path() {
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
        // May be None in stripped-down CI environments.
        if let Some(p) = user_config_path() {
            assert!(p.ends_with("folio/config.toml"));
        }
    }
}
