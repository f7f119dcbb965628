//! `kessler.toml` — optional user configuration.
//!
//! Looked up in the platform config directory
//! (`~/.config/kessler/kessler.toml` on Linux). Everything in it has a
//! flag or built-in default, so a missing file is not an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database file path. Overridden by `--db`.
    pub database: Option<PathBuf>,
    /// Source preference order for canonicalization.
    pub source_priority: Option<Vec<String>>,
}

impl Config {
    /// Load the config file if it exists, else defaults.
    pub fn load() -> Result<Config, CliError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, CliError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::error(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| CliError::error(format!("invalid config {}: {e}", path.display())))
    }

    /// Effective database path: `--db` flag, then config, then the
    /// platform data directory.
    pub fn database_path(&self, flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
        if let Some(path) = flag {
            return Ok(path);
        }
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dir = dirs::data_dir()
            .ok_or_else(|| CliError::error("cannot determine data directory"))?
            .join("kessler");
        std::fs::create_dir_all(&dir)
            .map_err(|e| CliError::error(format!("cannot create {}: {e}", dir.display())))?;
        Ok(dir.join("kessler.db"))
    }
}

fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("kessler").join("kessler.toml"))
}
