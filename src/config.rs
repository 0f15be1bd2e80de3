//! Quest runtime configuration, read from a TOML file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::quest::journal::JournalSettings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuestConfig {
    /// Root of the content tree (`quests/` and `givers/` live under it)
    pub data_dir: PathBuf,
    /// Longest completion cascade one call may trigger
    pub max_chain_depth: usize,
    /// Feed reward grants and turn-in consumption back as item reports
    pub inventory_reports: bool,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            max_chain_depth: 32,
            inventory_reports: true,
        }
    }
}

impl QuestConfig {
    /// Load config from `path`, falling back to defaults if the file is missing.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn journal_settings(&self) -> JournalSettings {
        JournalSettings {
            max_chain_depth: self.max_chain_depth,
            inventory_reports: self.inventory_reports,
        }
    }
}
