//! TOML configuration for the inspector.
//!
//! ```toml
//! log_level = "debug"
//! output = "json"
//!
//! [segment]
//! capacity = 4096
//! default_ttl_ms = 60000
//! ```
//!
//! Every key is optional.  A missing file is not an error: the inspector
//! runs with defaults.

use std::path::{Path, PathBuf};

use jtt_core::SegmentCacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How each inspected frame is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per frame.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level inspector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InspectConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub output: OutputFormat,
    /// Reassembly cache settings.
    #[serde(default)]
    pub segment: SegmentCacheConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output: OutputFormat::default(),
            segment: SegmentCacheConfig::default(),
        }
    }
}

impl InspectConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the TOML is malformed or a value has
    /// the wrong type.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Loads `InspectConfig` from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<InspectConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => InspectConfig::from_toml(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(InspectConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
