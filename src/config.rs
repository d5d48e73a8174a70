//! Configuration for imgstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Configuration for a store instance
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding one file per key
    pub data_dir: PathBuf,

    /// Delete entries that fail structural validation during `get`
    ///
    /// Destructive: a corrupt file is unlinked as a side effect of the
    /// failed read. Off by default.
    pub remove_corrupt: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./imgstore_data"),
            remove_corrupt: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable deletion of corrupt entries during `get`
    pub fn remove_corrupt(mut self, yes: bool) -> Self {
        self.config.remove_corrupt = yes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
