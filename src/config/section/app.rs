//! `[app]` section configuration.

use serde::{Deserialize, Serialize};

/// Application identity reported by `getUser` and `/api/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "tally".to_string(),
        }
    }
}
