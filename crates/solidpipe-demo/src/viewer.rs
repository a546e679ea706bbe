//! Display of demo results
//!
//! A [`ViewerContext`] is created once with [`ViewerContext::init`], receives
//! every solid and wire the demos want to show, and is closed with
//! [`ViewerContext::teardown`]. Display failures are logged and counted; they
//! never interrupt a modelling pipeline.

use std::path::{Path, PathBuf};

use glam::{DVec3, Vec3};
use solidpipe_cad::{CadError, ShapeBuilder, Solid, TessellatedMesh, Wire};
use tracing::{debug, info, warn};

use crate::config::{ViewerBackend, ViewerConfig};

/// Viewer-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Write error: {0}")]
    Write(String),
    #[error("Kernel error: {0}")]
    Kernel(#[from] CadError),
}

/// A display backend
pub trait Viewer {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Show a tessellated solid
    fn display_shape(
        &mut self,
        label: &str,
        mesh: &TessellatedMesh,
        update: bool,
    ) -> Result<(), ViewerError>;

    /// Show a polyline
    fn display_wire(&mut self, label: &str, points: &[DVec3], update: bool)
    -> Result<(), ViewerError>;

    /// Flush pending output
    fn finish(&mut self) -> Result<(), ViewerError>;
}

/// One item that reached a viewer
#[derive(Debug, Clone, PartialEq)]
pub enum Displayed {
    Shape { label: String, triangles: usize },
    Wire { label: String, points: usize },
}

impl Displayed {
    pub fn label(&self) -> &str {
        match self {
            Displayed::Shape { label, .. } | Displayed::Wire { label, .. } => label,
        }
    }
}

/// Headless viewer that keeps what it was given
#[derive(Debug, Default)]
pub struct RecordingViewer {
    records: Vec<Displayed>,
    finished: bool,
}

impl RecordingViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Displayed] {
        &self.records
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Viewer for RecordingViewer {
    fn name(&self) -> &str {
        "recording"
    }

    fn display_shape(
        &mut self,
        label: &str,
        mesh: &TessellatedMesh,
        update: bool,
    ) -> Result<(), ViewerError> {
        info!(
            "Display {}: {} triangles (update: {})",
            label,
            mesh.triangle_count(),
            update
        );
        self.records.push(Displayed::Shape {
            label: label.to_string(),
            triangles: mesh.triangle_count(),
        });
        Ok(())
    }

    fn display_wire(
        &mut self,
        label: &str,
        points: &[DVec3],
        update: bool,
    ) -> Result<(), ViewerError> {
        info!("Display {}: {} points (update: {})", label, points.len(), update);
        self.records.push(Displayed::Wire {
            label: label.to_string(),
            points: points.len(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ViewerError> {
        self.finished = true;
        Ok(())
    }
}

/// Writes every displayed solid to `<output_dir>/<index>-<label>.stl`
#[derive(Debug)]
pub struct StlViewer {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl StlViewer {
    /// Create the viewer, creating `output_dir` if needed
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ViewerError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|e| ViewerError::Io(e.to_string()))?;
        Ok(Self {
            output_dir,
            written: Vec::new(),
        })
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn file_name(&self, label: &str) -> String {
        let safe: String = label
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{:02}-{}.stl", self.written.len(), safe)
    }
}

/// Unit facet normal, +Z for degenerate triangles
fn facet_normal([v0, v1, v2]: &[[f32; 3]; 3]) -> [f32; 3] {
    let (a, b, c) = (Vec3::from(*v0), Vec3::from(*v1), Vec3::from(*v2));
    let normal = (b - a).cross(c - a).normalize_or_zero();
    if normal == Vec3::ZERO {
        [0.0, 0.0, 1.0]
    } else {
        normal.to_array()
    }
}

impl Viewer for StlViewer {
    fn name(&self) -> &str {
        "stl"
    }

    fn display_shape(
        &mut self,
        label: &str,
        mesh: &TessellatedMesh,
        _update: bool,
    ) -> Result<(), ViewerError> {
        let triangles: Vec<stl_io::Triangle> = mesh
            .triangles()
            .map(|corners| stl_io::Triangle {
                normal: stl_io::Normal::new(facet_normal(&corners)),
                vertices: [
                    stl_io::Vertex::new(corners[0]),
                    stl_io::Vertex::new(corners[1]),
                    stl_io::Vertex::new(corners[2]),
                ],
            })
            .collect();

        let path = self.output_dir.join(self.file_name(label));
        let mut file = std::fs::File::create(&path).map_err(|e| ViewerError::Io(e.to_string()))?;
        stl_io::write_stl(&mut file, triangles.iter())
            .map_err(|e| ViewerError::Write(e.to_string()))?;

        info!("Wrote {} triangles to {}", triangles.len(), path.display());
        self.written.push(path);
        Ok(())
    }

    fn display_wire(
        &mut self,
        label: &str,
        points: &[DVec3],
        _update: bool,
    ) -> Result<(), ViewerError> {
        // STL holds triangles only
        debug!("Skipping wire {} ({} points)", label, points.len());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ViewerError> {
        info!(
            "STL viewer wrote {} files to {}",
            self.written.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}

/// What a viewer context showed during its lifetime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerSummary {
    pub backend: String,
    pub displayed: Vec<Displayed>,
    /// Messages of display calls that failed
    pub failures: Vec<String>,
}

impl ViewerSummary {
    pub fn shape_count(&self) -> usize {
        self.displayed
            .iter()
            .filter(|d| matches!(d, Displayed::Shape { .. }))
            .count()
    }

    pub fn wire_count(&self) -> usize {
        self.displayed
            .iter()
            .filter(|d| matches!(d, Displayed::Wire { .. }))
            .count()
    }
}

/// An open viewer session
pub struct ViewerContext {
    viewer: Box<dyn Viewer>,
    tessellation_tolerance: f64,
    arc_segments: u32,
    summary: ViewerSummary,
}

impl ViewerContext {
    /// Open the backend named by `config`
    pub fn init(config: &ViewerConfig) -> Result<Self, ViewerError> {
        let viewer: Box<dyn Viewer> = match &config.backend {
            ViewerBackend::Recording => Box::new(RecordingViewer::new()),
            ViewerBackend::Stl { output_dir } => Box::new(StlViewer::new(output_dir)?),
        };
        Ok(Self::with_viewer(viewer, config))
    }

    /// Wrap an existing backend
    pub fn with_viewer(viewer: Box<dyn Viewer>, config: &ViewerConfig) -> Self {
        info!("Viewer {} ready", viewer.name());
        let summary = ViewerSummary {
            backend: viewer.name().to_string(),
            ..ViewerSummary::default()
        };
        Self {
            viewer,
            tessellation_tolerance: config.tessellation_tolerance,
            arc_segments: config.arc_segments,
            summary,
        }
    }

    /// Tessellate and show a solid
    pub fn show_solid(&mut self, builder: &ShapeBuilder<'_>, label: &str, solid: &Solid, update: bool) {
        let result = builder
            .tessellate(solid, self.tessellation_tolerance)
            .map_err(ViewerError::from)
            .and_then(|mesh| {
                self.viewer.display_shape(label, &mesh, update)?;
                Ok(mesh.triangle_count())
            });
        match result {
            Ok(triangles) => self.summary.displayed.push(Displayed::Shape {
                label: label.to_string(),
                triangles,
            }),
            Err(e) => self.record_failure(label, e),
        }
    }

    /// Sample and show a wire
    pub fn show_wire(&mut self, label: &str, wire: &Wire, update: bool) {
        let points = wire.sample(self.arc_segments);
        self.show_points(label, &points, update);
    }

    /// Show a polyline
    pub fn show_points(&mut self, label: &str, points: &[DVec3], update: bool) {
        match self.viewer.display_wire(label, points, update) {
            Ok(()) => self.summary.displayed.push(Displayed::Wire {
                label: label.to_string(),
                points: points.len(),
            }),
            Err(e) => self.record_failure(label, e),
        }
    }

    fn record_failure(&mut self, label: &str, error: ViewerError) {
        warn!("Failed to display {}: {}", label, error);
        self.summary.failures.push(format!("{}: {}", label, error));
    }

    /// Close the session
    pub fn teardown(mut self) -> ViewerSummary {
        if let Err(e) = self.viewer.finish() {
            warn!("Viewer {} failed to finish: {}", self.viewer.name(), e);
            self.summary.failures.push(format!("finish: {}", e));
        }
        info!(
            "Viewer {} closed: {} shapes, {} wires, {} failures",
            self.summary.backend,
            self.summary.shape_count(),
            self.summary.wire_count(),
            self.summary.failures.len()
        );
        self.summary
    }
}
