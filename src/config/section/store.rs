//! `[store]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [store]
//! backend = "file"            # "file" (durable) or "memory" (lost on exit)
//! dir = ".tally/store"        # Relative to the config file, `~` expanded
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which durable store implementation backs the actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// Durable store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Directory holding one document per counter (file backend only).
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            dir: PathBuf::from(".tally/store"),
        }
    }
}

impl StoreConfig {
    /// Expand `~` and resolve `dir` against the project root.
    pub fn normalize(&mut self, root: &Path) {
        let raw = self.dir.to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(&raw).into_owned());
        self.dir = if expanded.is_relative() {
            root.join(expanded)
        } else {
            expanded
        };
    }
}
