//! Kernel configuration
//!
//! Settings that control how a kernel discretizes and compares geometry.
//! Stored as RON, like project files.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default number of facets around a full circle
pub const DEFAULT_CIRCLE_SEGMENTS: u32 = 32;

/// Default linear tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Kernel discretization and tolerance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Number of facets used to approximate a full turn (circles, revolutions)
    pub circle_segments: u32,
    /// Linear tolerance for coincidence and closure checks
    pub tolerance: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl KernelConfig {
    /// Set the number of facets per full turn
    pub fn with_circle_segments(mut self, segments: u32) -> Self {
        self.circle_segments = segments;
        self
    }

    /// Set the linear tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Number of facets for an arc spanning `angle` radians (at least `minimum`)
    pub fn segments_for(&self, angle: f64, minimum: u32) -> u32 {
        let turns = angle.abs() / std::f64::consts::TAU;
        let segments = (turns * self.circle_segments as f64).ceil() as u32;
        segments.max(minimum)
    }

    /// Check that all values are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.circle_segments < 3 {
            return Err(ConfigError::Invalid(format!(
                "circle_segments must be at least 3, got {}",
                self.circle_segments
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig =
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty RON text
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
