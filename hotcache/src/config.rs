//! Cache configuration
//!
//! Configuration is plain serde data so it can live in a YAML file next to
//! the sources it governs:
//!
//! ```yaml
//! hot_reload: true
//! max_build_depth: 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default limit on nested builds
pub const DEFAULT_MAX_BUILD_DEPTH: usize = 64;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for [`CacheConfig`]
    #[error("Invalid cache config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range
    #[error("Invalid cache config: {0}")]
    Invalid(String),
}

/// Tunables for an [`ArtifactCache`](crate::ArtifactCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Check cached entries for staleness on every hit.
    ///
    /// When disabled, hits are served as-is and nothing is ever rebuilt.
    pub hot_reload: bool,

    /// How many builds may be nested inside each other before the request
    /// fails with `DepthExceeded`.
    pub max_build_depth: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hot_reload: true,
            max_build_depth: DEFAULT_MAX_BUILD_DEPTH,
        }
    }
}

impl CacheConfig {
    /// Parse configuration from a YAML document.
    ///
    /// Missing fields take their default value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed YAML or unknown fields and
    /// `ConfigError::Invalid` for out-of-range values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file can't be read, otherwise the
    /// same errors as [`CacheConfig::from_yaml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_build_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_build_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
