// src/config.rs

//! Configuration loading utilities.
//!
//! Values come from a TOML file (or defaults when it is missing) and are then
//! overridden by whatever the command line supplied.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Config;

/// Command-line overrides; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub once: bool,
    pub interval_secs: Option<u64>,
    pub jitter_secs: Option<u64>,
    pub source: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub app_name: Option<String>,
    pub artifact_name: Option<String>,
}

impl Overrides {
    /// Apply overrides on top of `config`.
    pub fn apply(self, mut config: Config) -> Config {
        if self.once {
            config.schedule.once = true;
        }
        if let Some(secs) = self.interval_secs {
            config.schedule.interval_secs = secs;
        }
        if let Some(secs) = self.jitter_secs {
            config.schedule.jitter_secs = secs;
        }
        if let Some(source) = self.source {
            config.collector.source = source;
        }
        if let Some(dir) = self.storage_dir {
            config.collector.storage_dir = Some(dir);
        }
        if let Some(name) = self.app_name {
            config.collector.app_name = name;
        }
        if let Some(name) = self.artifact_name {
            config.collector.artifact_name = name;
        }
        config
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults only when the file is absent; a file that exists
/// but cannot be read or parsed is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path)
}

/// Load, override and validate the effective configuration.
pub fn resolve(path: &Path, overrides: Overrides) -> Result<Config> {
    let config = overrides.apply(load_config(path)?);
    config.validate()?;
    Ok(config)
}
