//! Service configuration management for `tally.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── serve      # [serve]
//! │   ├── store      # [store]
//! │   ├── actor      # [actor]
//! │   └── app        # [app]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── handle     # Global config handle
//! └── mod.rs         # TallyConfig (this file)
//! ```
//!
//! A missing config file is not an error: every section has defaults and
//! the project root falls back to the current directory.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{ActorConfig, AppConfig, ServeConfig, StoreBackend, StoreConfig};
pub use types::{ConfigDiagnostics, ConfigError, cfg, init_config};

use crate::{
    cli::{Cli, Commands},
    debug, log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing tally.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Listener settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Durable store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Actor runtime settings
    #[serde(default)]
    pub actor: ActorConfig,

    /// Application identity
    #[serde(default)]
    pub app: AppConfig,
}

impl TallyConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; the project root is the
    /// config file's parent directory (or cwd when there is no file).
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                debug!("config"; "loading {}", path.display());
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    root: cwd.clone(),
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} (ignored):", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Finalize configuration after loading.
    fn finalize(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);
        let root = self.root.clone();
        self.store.normalize(&root);
        self.apply_command_options(cli);
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve {
                interface,
                port,
                ws_port,
                memory,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
                if *memory {
                    self.store.backend = StoreBackend::Memory;
                }
            }
            Commands::Watch { ws_port, .. } => {
                Self::update_option(&mut self.serve.ws_port, ws_port.as_ref());
            }
            // Inspect reads the store as configured
            Commands::Inspect { .. } => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        self.actor.validate(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from a TOML snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> TallyConfig {
    let (parsed, ignored) = TallyConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_toml() {
        let result = TallyConfig::parse_with_ignored("[serve\nport = 1");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_config_default() {
        let config = TallyConfig::default();

        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.serve.port, 5277);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.app.name, "tally");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nport = 8000\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = TallyConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.serve.port, 8000);
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[serve]\nport = 8000\n[app]\nname = \"demo\"";
        let (config, ignored) = TallyConfig::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
        assert_eq!(config.app.name, "demo");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = test_parse_config("[serve]\nport = 0\n[actor]\nmailbox = 0");
        let err = config.validate().unwrap_err();
        let ConfigError::Diagnostics(diag) = err.downcast::<ConfigError>().unwrap() else {
            panic!("expected diagnostics");
        };
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn test_serve_flags_override_file() {
        use clap::Parser;

        let cli = Cli::parse_from(["tally", "serve", "--port", "9000", "--memory"]);
        let mut config = test_parse_config("[serve]\nport = 8000\nws_port = 8001");
        config.apply_command_options(&cli);

        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.ws_port, 8001);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }
}
