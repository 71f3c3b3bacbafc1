// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration loading.

use crate::config::AppConfig;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Overrides `connection.address` when set.
pub const ADDRESS_ENV: &str = "MIXLINK_ADDRESS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Locates and reads the configuration file. Nothing is ever written.
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses the platform config directory.
    pub fn new() -> Result<Self, ConfigError> {
        let project_dirs =
            ProjectDirs::from("", "", "mixlink").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_dir(project_dirs.config_dir()))
    }

    pub fn with_dir(config_dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the path to the main config file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Load the application config. A missing file yields the defaults.
    pub fn load_config(&self) -> Result<AppConfig, ConfigError> {
        self.load_with_address(env_address())
    }

    /// Like [`load_config`](Self::load_config), but falls back to the
    /// defaults when the file cannot be read. The environment override
    /// applies either way.
    pub fn load_config_or_default(&self) -> (AppConfig, Option<ConfigError>) {
        self.load_or_default_with_address(env_address())
    }

    fn read_config(&self) -> Result<AppConfig, ConfigError> {
        let path = self.config_path();
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let content = fs::read_to_string(&path)?;
            Ok(AppConfig::from_toml(&content)?)
        } else {
            debug!("No config at {:?}, using defaults", path);
            Ok(AppConfig::default())
        }
    }

    fn load_with_address(&self, address: Option<String>) -> Result<AppConfig, ConfigError> {
        let mut config = self.read_config()?;
        override_address(&mut config, address);
        Ok(config)
    }

    fn load_or_default_with_address(
        &self,
        address: Option<String>,
    ) -> (AppConfig, Option<ConfigError>) {
        let (mut config, error) = match self.read_config() {
            Ok(config) => (config, None),
            Err(e) => (AppConfig::default(), Some(e)),
        };
        override_address(&mut config, address);
        (config, error)
    }
}

/// Applies environment overrides to an already chosen config.
pub fn apply_env_overrides(config: &mut AppConfig) {
    override_address(config, env_address());
}

fn env_address() -> Option<String> {
    std::env::var(ADDRESS_ENV).ok()
}

fn override_address(config: &mut AppConfig, address: Option<String>) {
    if let Some(address) = address.filter(|a| !a.trim().is_empty()) {
        info!("Server address overridden by {}: {}", ADDRESS_ENV, address);
        config.connection.address = address;
    }
}
