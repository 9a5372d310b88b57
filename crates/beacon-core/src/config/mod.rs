//! Validation configuration parsing and validation.
//!
//! The whole configuration surface is supplied once, at coordinator
//! construction; nothing here is mutable at runtime. Files are TOML:
//!
//! ```toml
//! validation_threshold = 0.75
//! max_validation_wait_ms = 120000
//!
//! [trust_weights]
//! crowd_report = 0.30
//! media_evidence = 0.25
//! social_media = 0.15
//! nearby_device = 0.10
//! official_source = 0.20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::{TrustWeights, WeightsError};

/// Default score at or above which a session is auto-validated.
pub const DEFAULT_VALIDATION_THRESHOLD: f64 = 0.75;

/// Default maximum time to wait for validation, in milliseconds.
pub const DEFAULT_MAX_VALIDATION_WAIT_MS: u64 = 120_000;

/// Errors from configuration loading or validation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field failed fail-closed validation.
    #[error("invalid config: {0}")]
    Validation(String),

    /// The trust weights are not a valid distribution.
    #[error(transparent)]
    Weights(#[from] WeightsError),
}

/// Construction-time configuration for the validation coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Score at or above which a session is auto-validated.
    #[serde(default = "default_threshold")]
    pub validation_threshold: f64,

    /// Hard wall-clock bound on a session, from creation, in milliseconds.
    #[serde(default = "default_max_wait_ms")]
    pub max_validation_wait_ms: u64,

    /// Static per-category weights.
    #[serde(default)]
    pub trust_weights: TrustWeights,
}

const fn default_threshold() -> f64 {
    DEFAULT_VALIDATION_THRESHOLD
}

const fn default_max_wait_ms() -> u64 {
    DEFAULT_MAX_VALIDATION_WAIT_MS
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validation_threshold: DEFAULT_VALIDATION_THRESHOLD,
            max_validation_wait_ms: DEFAULT_MAX_VALIDATION_WAIT_MS,
            trust_weights: TrustWeights::SOURCE_POLICY,
        }
    }
}

impl ValidationConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the TOML is invalid or any field fails
    /// validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail-closed validation of every field.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.validation_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.validation_threshold)
        {
            return Err(ConfigError::Validation(format!(
                "validation_threshold must be within [0, 1], got {}",
                self.validation_threshold
            )));
        }
        if self.max_validation_wait_ms == 0 {
            return Err(ConfigError::Validation(
                "max_validation_wait_ms must be positive".to_string(),
            ));
        }
        self.trust_weights.validate()?;
        Ok(())
    }

    /// The maximum wait as a [`Duration`].
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_validation_wait_ms)
    }
}
