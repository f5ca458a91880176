//! Deployment configuration: form defaults and default colors
//!
//! ```yaml
//! default_name: Vacuum map
//! default_server: openapi.tuyaeu.com
//! colors:
//!   background: [0, 0, 0]
//!   wall: [0, 0, 0]
//!   room: [70, 70, 70]
//!   unset: [0, 0, 0]
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::color::Rgb;
use crate::consts::DEFAULT_NAME;
use crate::server::ServerRegion;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Colors used when the user never chose one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDefaults {
    /// Background when the color step was skipped
    pub background: Rgb,
    /// Walls when the color step was skipped
    pub wall: Rgb,
    /// Every room (or the inside of a roomless map) when room colors were skipped
    pub room: Rgb,
    /// Fill for a color field left blank on a form that was shown
    pub unset: Rgb,
}

impl Default for ColorDefaults {
    fn default() -> Self {
        Self {
            background: Rgb::BLACK,
            wall: Rgb::BLACK,
            room: Rgb::new(70, 70, 70),
            unset: Rgb::BLACK,
        }
    }
}

/// Configuration for the map extractor flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapExtractorConfig {
    /// Pre-filled display name on the first form
    pub default_name: String,
    /// Pre-selected server on the first form
    pub default_server: ServerRegion,
    pub colors: ColorDefaults,
}

impl Default for MapExtractorConfig {
    fn default() -> Self {
        Self {
            default_name: DEFAULT_NAME.to_string(),
            default_server: ServerRegion::default(),
            colors: ColorDefaults::default(),
        }
    }
}

impl MapExtractorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, Path::new("<string>"))
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source,
        })
    }
}
