//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. An explicit `--config <file>`
//! 2. Current directory: ./rpcheckup.toml
//! 3. Built-in defaults

use crate::env;
use crate::services::{DatabaseOptions, ToolOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Contents of `rpcheckup.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub database: DatabaseOptions,
    pub introspector: ToolOptions,
    pub output: OutputOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub directory: PathBuf,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(env::DEFAULT_OUTPUT_DIR),
        }
    }
}

impl RunConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the explicit file if given, else discover one in the current directory.
    pub fn load(explicit: Option<&Path>) -> Result<RunConfig> {
        if let Some(path) = explicit {
            info!("Loading configuration from: {:?}", path);
            return RunConfig::from_toml_file(path);
        }

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Self::discover_in(&cwd)
    }

    /// Load `rpcheckup.toml` from `dir`, or defaults if there is none.
    pub fn discover_in(dir: &Path) -> Result<RunConfig> {
        if let Some(config_path) = Self::find_config_file(dir) {
            info!("Loading configuration from: {:?}", config_path);
            return RunConfig::from_toml_file(config_path);
        }

        debug!("No configuration file found, using defaults");
        Ok(RunConfig::default())
    }

    /// Find the configuration file in `dir`
    pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
        let candidate = dir.join(env::CONFIG_FILE_NAME);
        debug!("Checking for config file: {:?}", candidate);
        candidate.is_file().then_some(candidate)
    }
}
