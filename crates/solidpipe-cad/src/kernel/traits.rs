//! CAD Kernel trait definitions
//!
//! These traits define the interface that all CAD kernels must implement.
//! A kernel owns every shape it creates; callers only hold [`Solid`] handles.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::KernelConfig;
use crate::geometry::{Aabb, Axis3D, Frame, Transform};
use crate::sketch::{Edge, FilletResult, Profile};

/// Error type for CAD kernel operations
///
/// Every variant names the operation that failed so a message can be traced
/// back to the pipeline step that produced it.
#[derive(Debug, Clone, Error)]
pub enum CadError {
    #[error("{operation}: invalid parameter: {message}")]
    InvalidParameter {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: geometry error: {message}")]
    Geometry {
        operation: &'static str,
        message: String,
    },

    #[error("boolean {op} of {a} and {b} failed: {message}")]
    BooleanOperation {
        op: BooleanType,
        a: Uuid,
        b: Uuid,
        message: String,
    },

    #[error("profile {profile} is not closed (gap {gap:.3e})")]
    OpenProfile { profile: Uuid, gap: f64 },

    #[error("{operation}: solid {id} not found")]
    SolidNotFound { operation: &'static str, id: Uuid },

    #[error("Kernel not available: {0}")]
    KernelNotAvailable(String),
}

impl CadError {
    /// Name of the operation that failed, if the variant records one
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            CadError::InvalidParameter { operation, .. }
            | CadError::Geometry { operation, .. }
            | CadError::SolidNotFound { operation, .. } => Some(operation),
            CadError::BooleanOperation { .. } => Some("boolean"),
            CadError::OpenProfile { .. } => Some("revolve"),
            CadError::KernelNotAvailable(_) => None,
        }
    }

    pub(crate) fn invalid(operation: &'static str, message: impl Into<String>) -> Self {
        CadError::InvalidParameter {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn geometry(operation: &'static str, message: impl Into<String>) -> Self {
        CadError::Geometry {
            operation,
            message: message.into(),
        }
    }
}

/// Result type for CAD operations
pub type CadResult<T> = Result<T, CadError>;

/// A 3D solid body
///
/// An opaque handle; the shape itself lives inside the kernel that created it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Solid {
    /// Unique identifier
    pub id: Uuid,
}

impl Solid {
    /// Create a new solid with the given ID
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

impl fmt::Display for Solid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Boolean operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanType {
    /// Subtract the second shape from the first
    Cut,
    /// Union of both shapes
    Fuse,
    /// Intersection of both shapes
    Common,
}

impl BooleanType {
    /// Whether swapping the operands leaves the result unchanged
    pub fn is_commutative(&self) -> bool {
        !matches!(self, BooleanType::Cut)
    }

    /// Lowercase name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            BooleanType::Cut => "cut",
            BooleanType::Fuse => "fuse",
            BooleanType::Common => "common",
        }
    }
}

impl fmt::Display for BooleanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitive solid kinds, in the local coordinates of a [`Frame`]
///
/// The frame's main direction is the primitive's axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    /// Sphere centred at the frame origin, bounded by two latitudes (radians)
    ///
    /// A full sphere spans `-π/2..π/2`. Narrower ranges give a spherical zone
    /// with flat caps.
    Sphere {
        radius: f64,
        min_latitude: f64,
        max_latitude: f64,
    },
    /// Cylinder whose base circle is centred at the frame origin, extending
    /// `height` along the main direction
    Cylinder { radius: f64, height: f64 },
    /// Torus centred at the frame origin, ring in the frame's XY plane
    Torus {
        major_radius: f64,
        minor_radius: f64,
    },
}

impl Primitive {
    /// Full sphere
    pub fn sphere(radius: f64) -> Self {
        Primitive::Sphere {
            radius,
            min_latitude: -std::f64::consts::FRAC_PI_2,
            max_latitude: std::f64::consts::FRAC_PI_2,
        }
    }

    /// Spherical zone between two latitudes
    pub fn sphere_zone(radius: f64, min_latitude: f64, max_latitude: f64) -> Self {
        Primitive::Sphere {
            radius,
            min_latitude,
            max_latitude,
        }
    }

    /// Cylinder
    pub fn cylinder(radius: f64, height: f64) -> Self {
        Primitive::Cylinder { radius, height }
    }

    /// Torus
    pub fn torus(major_radius: f64, minor_radius: f64) -> Self {
        Primitive::Torus {
            major_radius,
            minor_radius,
        }
    }

    /// Short name of the primitive kind
    pub fn kind(&self) -> &'static str {
        match self {
            Primitive::Sphere { .. } => "sphere",
            Primitive::Cylinder { .. } => "cylinder",
            Primitive::Torus { .. } => "torus",
        }
    }

    /// Check dimensions and angles
    pub fn validate(&self) -> CadResult<()> {
        const OPERATION: &str = "make_primitive";
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(CadError::invalid(
                    OPERATION,
                    format!("{} {} must be a positive number, got {}", self.kind(), name, value),
                ))
            }
        };

        match *self {
            Primitive::Sphere {
                radius,
                min_latitude,
                max_latitude,
            } => {
                positive("radius", radius)?;
                for (name, angle) in [("min_latitude", min_latitude), ("max_latitude", max_latitude)] {
                    if !angle.is_finite() || angle.abs() > std::f64::consts::PI {
                        return Err(CadError::invalid(
                            OPERATION,
                            format!("sphere {} must lie within [-pi, pi], got {}", name, angle),
                        ));
                    }
                }
                if min_latitude >= max_latitude {
                    return Err(CadError::invalid(
                        OPERATION,
                        format!(
                            "sphere min_latitude {} must be below max_latitude {}",
                            min_latitude, max_latitude
                        ),
                    ));
                }
                let pole = std::f64::consts::FRAC_PI_2;
                if min_latitude.clamp(-pole, pole) >= max_latitude.clamp(-pole, pole) {
                    return Err(CadError::invalid(
                        OPERATION,
                        format!(
                            "sphere zone [{}, {}] is empty once clamped to the poles",
                            min_latitude, max_latitude
                        ),
                    ));
                }
                Ok(())
            }
            Primitive::Cylinder { radius, height } => {
                positive("radius", radius)?;
                positive("height", height)
            }
            Primitive::Torus {
                major_radius,
                minor_radius,
            } => {
                positive("major_radius", major_radius)?;
                positive("minor_radius", minor_radius)?;
                if minor_radius >= major_radius {
                    return Err(CadError::invalid(
                        OPERATION,
                        format!(
                            "torus minor_radius {} must be smaller than major_radius {}",
                            minor_radius, major_radius
                        ),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Volume and surface measurements of a solid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    /// Enclosed volume
    pub volume: f64,
    /// Total boundary area
    pub surface_area: f64,
    /// Center of mass (uniform density)
    pub centroid: DVec3,
    /// Axis-aligned bounds
    pub bounds: Aabb,
    /// Number of boundary faces (facets for a polygonal kernel)
    pub face_count: usize,
}

/// A tessellated mesh output from the CAD kernel
#[derive(Debug, Clone, Default)]
pub struct TessellatedMesh {
    /// Vertex positions (3 floats per vertex)
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals (3 floats per vertex)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (3 indices per triangle)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty tessellated mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Append a flat-shaded triangle
    pub fn push_triangle(&mut self, corners: [DVec3; 3], normal: DVec3) {
        let base = self.vertices.len() as u32;
        let n = normal.as_vec3().to_array();
        for corner in corners {
            self.vertices.push(corner.as_vec3().to_array());
            self.normals.push(n);
        }
        self.indices.extend([base, base + 1, base + 2]);
    }

    /// Iterate over triangles as corner positions
    pub fn triangles(&self) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }
}

/// The main CAD kernel trait
///
/// Implementations of this trait provide the actual geometry operations
/// using different backends (polygonal mesh, Truck, etc.). Every operation
/// that produces geometry returns a new, immutable [`Solid`]; inputs are
/// never modified.
pub trait CadKernel: Send + Sync {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    /// Check if the kernel is available
    fn is_available(&self) -> bool;

    /// Create a primitive solid positioned by `frame`
    fn create_primitive(&self, frame: &Frame, primitive: &Primitive) -> CadResult<Solid>;

    /// Perform a boolean operation on two solids
    ///
    /// # Arguments
    /// * `a` - The first solid (the one cut from, for [`BooleanType::Cut`])
    /// * `b` - The second solid
    /// * `op` - The boolean operation type
    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid>;

    /// Return a transformed copy of a solid
    ///
    /// With `deep_copy` the result owns duplicated topology; otherwise it
    /// shares the source topology under a new location.
    fn transform(&self, solid: &Solid, transform: &Transform, deep_copy: bool)
    -> CadResult<Solid>;

    /// Revolve a closed planar profile around an axis
    ///
    /// # Arguments
    /// * `profile` - Closed profile lying in a plane that contains the axis
    /// * `axis` - The rotation axis
    /// * `angle` - The rotation angle in radians, in (0, 2π]
    fn revolve(&self, profile: &Profile, axis: &Axis3D, angle: f64) -> CadResult<Solid>;

    /// Remove a through cylinder of `radius` along `axis` from `base`
    fn drill_hole(&self, base: &Solid, axis: &Axis3D, radius: f64) -> CadResult<Solid>;

    /// Round the corner between two line edges lying on `plane`
    fn fillet_2d(
        &self,
        first: &Edge,
        second: &Edge,
        radius: f64,
        plane: &Frame,
    ) -> CadResult<FilletResult>;

    /// Tessellate a solid into triangles
    ///
    /// # Arguments
    /// * `solid` - The solid to tessellate
    /// * `tolerance` - The tessellation tolerance (lower = more triangles)
    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh>;

    /// Measure volume, area, centroid and bounds
    fn mass_properties(&self, solid: &Solid) -> CadResult<MassProperties>;

    /// Whether two handles refer to the same underlying topology
    ///
    /// Unknown handles never share topology.
    fn shares_topology(&self, a: &Solid, b: &Solid) -> bool;

    /// Drop the kernel data behind a handle; returns false if it was unknown
    fn release(&self, solid: &Solid) -> bool;
}

/// A null kernel that always returns errors (used when no kernel is available)
#[derive(Debug, Default)]
pub struct NullKernel;

impl NullKernel {
    fn unavailable<T>() -> CadResult<T> {
        Err(CadError::KernelNotAvailable(
            "No CAD kernel available".into(),
        ))
    }
}

impl CadKernel for NullKernel {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn create_primitive(&self, _frame: &Frame, _primitive: &Primitive) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn boolean(&self, _a: &Solid, _b: &Solid, _op: BooleanType) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn transform(
        &self,
        _solid: &Solid,
        _transform: &Transform,
        _deep_copy: bool,
    ) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn revolve(&self, _profile: &Profile, _axis: &Axis3D, _angle: f64) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn drill_hole(&self, _base: &Solid, _axis: &Axis3D, _radius: f64) -> CadResult<Solid> {
        Self::unavailable()
    }

    fn fillet_2d(
        &self,
        _first: &Edge,
        _second: &Edge,
        _radius: f64,
        _plane: &Frame,
    ) -> CadResult<FilletResult> {
        Self::unavailable()
    }

    fn tessellate(&self, _solid: &Solid, _tolerance: f64) -> CadResult<TessellatedMesh> {
        Self::unavailable()
    }

    fn mass_properties(&self, _solid: &Solid) -> CadResult<MassProperties> {
        Self::unavailable()
    }

    fn shares_topology(&self, _a: &Solid, _b: &Solid) -> bool {
        false
    }

    fn release(&self, _solid: &Solid) -> bool {
        false
    }
}

/// Get the default CAD kernel based on available features
pub fn default_kernel() -> Box<dyn CadKernel> {
    kernel_with_config(KernelConfig::default())
}

/// Get the default CAD kernel configured with `config`
pub fn kernel_with_config(config: KernelConfig) -> Box<dyn CadKernel> {
    #[cfg(feature = "truck")]
    {
        Box::new(super::TruckKernel::with_config(config))
    }

    #[cfg(not(feature = "truck"))]
    {
        Box::new(super::MeshKernel::with_config(config))
    }
}
