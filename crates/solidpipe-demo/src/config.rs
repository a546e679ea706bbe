//! Demo application settings
//!
//! One RON file selects the kernel settings, the viewer backend and the
//! demos to run. Every field has a default, so an empty `()` is valid.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use solidpipe_cad::{ConfigError, KernelConfig};

/// Default chord tolerance for tessellating solids before display
pub const DEFAULT_TESSELLATION_TOLERANCE: f64 = 0.01;

/// The demo pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemoKind {
    /// Sphere zone drilled, notched, fused with a torus and grooved
    MixedBoolean,
    /// Two lines joined by a tangent arc
    Fillet2d,
    /// Quadrilateral revolved about the Y axis
    Revolve,
}

impl DemoKind {
    pub const ALL: &'static [DemoKind] =
        &[DemoKind::MixedBoolean, DemoKind::Fillet2d, DemoKind::Revolve];

    pub fn name(&self) -> &'static str {
        match self {
            DemoKind::MixedBoolean => "mixed_boolean",
            DemoKind::Fillet2d => "fillet_2d",
            DemoKind::Revolve => "revolve",
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where displayed shapes go
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ViewerBackend {
    /// Keep an in-memory record and log each display call
    #[default]
    Recording,
    /// Write every displayed solid to an STL file in `output_dir`
    Stl { output_dir: PathBuf },
}

/// Viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub backend: ViewerBackend,
    /// Chord tolerance passed to the kernel when tessellating
    pub tessellation_tolerance: f64,
    /// Facets per full turn when sampling arcs of displayed wires
    pub arc_segments: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend: ViewerBackend::default(),
            tessellation_tolerance: DEFAULT_TESSELLATION_TOLERANCE,
            arc_segments: 64,
        }
    }
}

/// Top-level demo configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub kernel: KernelConfig,
    pub viewer: ViewerConfig,
    /// Demos to run, in order
    pub demos: Vec<DemoKind>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            viewer: ViewerConfig::default(),
            demos: DemoKind::ALL.to_vec(),
        }
    }
}

impl DemoConfig {
    /// Check nested settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kernel.validate()?;
        let tolerance = self.viewer.tessellation_tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tessellation_tolerance must be a positive number, got {}",
                tolerance
            )));
        }
        if self.viewer.arc_segments == 0 {
            return Err(ConfigError::Invalid("arc_segments must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig =
            ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Save the configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DemoConfig::from_ron_str("()").unwrap();
        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.demos.len(), 3);
    }

    #[test]
    fn test_partial_config() {
        let config = DemoConfig::from_ron_str(
            r#"(
                kernel: (circle_segments: 64),
                viewer: (backend: Stl(output_dir: "out")),
                demos: [Revolve],
            )"#,
        )
        .unwrap();
        assert_eq!(config.kernel.circle_segments, 64);
        assert_eq!(
            config.viewer.backend,
            ViewerBackend::Stl {
                output_dir: PathBuf::from("out")
            }
        );
        assert_eq!(config.demos, vec![DemoKind::Revolve]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = DemoConfig::from_ron_str("(kernel: (circle_segments: 2))");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let result = DemoConfig::from_ron_str("(viewer: (tessellation_tolerance: 0.0))");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        let result = DemoConfig::from_ron_str("(demos: [Unknown])");
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.ron");
        let config = DemoConfig {
            demos: vec![DemoKind::Fillet2d, DemoKind::MixedBoolean],
            ..DemoConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(DemoConfig::load(&path).unwrap(), config);
    }
}
