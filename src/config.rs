//! Configuration for the essentials core.
//!
//! With the `persist` feature the config is read from a RON file; without it
//! the same types exist and defaults are used.

use std::path::Path;
#[cfg(feature = "persist")]
use std::fs;

use bevy::prelude::*;
#[cfg(feature = "persist")]
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "essentials.ron";

/// A command defined in config that prints fixed lines to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
pub struct TextCommandDef {
    pub name: String,
    #[cfg_attr(feature = "persist", serde(default))]
    pub aliases: Vec<String>,
    #[cfg_attr(feature = "persist", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "persist", serde(default))]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "persist", serde(default))]
pub struct UpdaterConfig {
    pub check_updates: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            check_updates: true,
        }
    }
}

/// Serializable essentials configuration.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "persist", serde(default))]
pub struct EssentialsConfig {
    /// Commands removed from the registry after bootstrap.
    pub disabled_commands: Vec<String>,
    pub enable_text_commands: bool,
    pub text_commands: Vec<TextCommandDef>,
    pub updater: UpdaterConfig,
    /// RON map of message overrides, relative to the working directory.
    pub locale_file: Option<String>,
}

impl Default for EssentialsConfig {
    fn default() -> Self {
        Self {
            disabled_commands: Vec::new(),
            enable_text_commands: true,
            text_commands: Vec::new(),
            updater: UpdaterConfig::default(),
            locale_file: None,
        }
    }
}

/// Errors that can occur during config operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("IO error for '{0}': {1}")]
    Io(String, String),
    #[error("Parse error for '{0}': {1}")]
    Parse(String, String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Resource tracking the config file path.
#[derive(Resource, Debug, Clone)]
pub struct ConfigPath(pub String);

impl Default for ConfigPath {
    fn default() -> Self {
        Self(DEFAULT_CONFIG_FILE.to_string())
    }
}

impl EssentialsConfig {
    /// Load the config at `path`, using defaults when the file is missing.
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("No config file found at '{}', using defaults", path.display());
            return Ok(Self::default());
        }

        Self::load(path)
    }

    #[cfg(feature = "persist")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config: Self = load_ron(path)?;
        info!("Loaded config from '{}'", path.display());
        Ok(config)
    }

    #[cfg(not(feature = "persist"))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!(
            "Built without `persist`; ignoring '{}'",
            path.as_ref().display()
        );
        Ok(Self::default())
    }

    #[cfg(feature = "persist")]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        save_ron(self, path.as_ref())
    }
}

/// Read and parse a RON file.
#[cfg(feature = "persist")]
pub fn load_ron<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;

    ron::from_str(&contents)
        .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
}

/// Write `value` as pretty RON, creating parent directories as needed.
#[cfg(feature = "persist")]
pub fn save_ron<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(parent.display().to_string(), e.to_string()))?;
        }
    }

    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .separate_tuple_members(true)
        .enumerate_arrays(false);

    let contents = ron::ser::to_string_pretty(value, pretty)
        .map_err(|e| ConfigError::Serialize(e.to_string()))?;

    fs::write(path, contents).map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))
}
