//! Polygonal CAD Kernel Backend
//!
//! Faceted solids with BSP-tree boolean operations. Curved surfaces are
//! approximated by planar facets whose density follows
//! [`KernelConfig::circle_segments`].

mod csg;
mod polygon;
pub(crate) mod primitives;
mod shape;
pub(crate) mod sweep;

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use self::shape::MeshShape;
use super::{
    BooleanType, CadError, CadKernel, CadResult, MassProperties, Primitive, Solid, TessellatedMesh,
};
use crate::config::KernelConfig;
use crate::geometry::{Axis3D, Frame, Transform};
use crate::sketch::{self, Edge, FilletResult, Profile};

/// Mesh-based CAD kernel
pub struct MeshKernel {
    config: KernelConfig,
    /// Storage for shape data (keyed by UUID)
    shapes: RwLock<HashMap<Uuid, MeshShape>>,
}

impl MeshKernel {
    /// Create a new mesh kernel with default settings
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Create a new mesh kernel with the given settings
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            config,
            shapes: RwLock::new(HashMap::new()),
        }
    }

    /// Kernel settings
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Number of live shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.read().len()
    }

    /// Store a shape and return a Solid reference
    fn store_shape(&self, shape: MeshShape) -> Solid {
        let id = Uuid::new_v4();
        self.shapes.write().insert(id, shape);
        Solid::new(id)
    }

    /// Get a stored shape by ID
    fn get_shape(&self, operation: &'static str, solid: &Solid) -> CadResult<MeshShape> {
        self.shapes
            .read()
            .get(&solid.id)
            .cloned()
            .ok_or(CadError::SolidNotFound {
                operation,
                id: solid.id,
            })
    }

    /// Reject empty and inside-out results
    fn check_volume(&self, shape: &MeshShape) -> Result<(), String> {
        if shape.polygon_count() == 0 {
            return Err("result is empty".into());
        }
        let props = shape.mass_properties();
        let diagonal = props.bounds.diagonal();
        if props.volume.abs() <= self.config.tolerance * diagonal * diagonal {
            return Err(format!("result has no volume ({:.3e})", props.volume));
        }
        if props.volume < 0.0 {
            return Err(format!("result is inside out (volume {:.3e})", props.volume));
        }
        Ok(())
    }

    fn combine(
        &self,
        a: &MeshShape,
        b: &MeshShape,
        op: BooleanType,
    ) -> Result<MeshShape, String> {
        let polygons = csg::combine(a.world_polygons(), b.world_polygons(), op);
        let shape = MeshShape::new(polygons);
        self.check_volume(&shape)?;
        Ok(shape)
    }
}

impl Default for MeshKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl CadKernel for MeshKernel {
    fn name(&self) -> &str {
        "mesh"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn create_primitive(&self, frame: &Frame, primitive: &Primitive) -> CadResult<Solid> {
        if !frame.is_valid() {
            return Err(CadError::invalid(
                "make_primitive",
                format!("frame {:?} is not orthonormal", frame),
            ));
        }
        let polygons = primitives::build(primitive, &self.config)?;
        debug!(
            "Created {} with {} facets at {:?}",
            primitive.kind(),
            polygons.len(),
            frame.origin
        );
        Ok(self.store_shape(MeshShape::located(polygons, frame.to_affine())))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let shape_a = self.get_shape("boolean", a)?;
        let shape_b = self.get_shape("boolean", b)?;
        let shape = self
            .combine(&shape_a, &shape_b, op)
            .map_err(|message| CadError::BooleanOperation {
                op,
                a: a.id,
                b: b.id,
                message,
            })?;
        debug!(
            "Boolean {} of {} ({} facets) and {} ({} facets) gave {} facets",
            op,
            a.id,
            shape_a.polygon_count(),
            b.id,
            shape_b.polygon_count(),
            shape.polygon_count()
        );
        Ok(self.store_shape(shape))
    }

    fn transform(
        &self,
        solid: &Solid,
        transform: &Transform,
        deep_copy: bool,
    ) -> CadResult<Solid> {
        if !transform.is_finite() {
            return Err(CadError::invalid(
                "apply_transform",
                "transform has non-finite components",
            ));
        }
        let source = self.get_shape("apply_transform", solid)?;
        let moved = source.moved(transform.as_affine());
        let shape = if deep_copy { moved.baked() } else { moved };
        Ok(self.store_shape(shape))
    }

    fn revolve(&self, profile: &Profile, axis: &Axis3D, angle: f64) -> CadResult<Solid> {
        let polygons = sweep::revolve(profile, axis, angle, &self.config)?;
        debug!(
            "Revolved profile {} by {:.4} rad into {} facets",
            profile.id,
            angle,
            polygons.len()
        );
        Ok(self.store_shape(MeshShape::new(polygons)))
    }

    fn drill_hole(&self, base: &Solid, axis: &Axis3D, radius: f64) -> CadResult<Solid> {
        const OPERATION: &str = "drill_hole";
        if !radius.is_finite() || radius <= 0.0 {
            return Err(CadError::invalid(
                OPERATION,
                format!("hole radius must be a positive number, got {}", radius),
            ));
        }
        if !axis.is_valid() {
            return Err(CadError::invalid(
                OPERATION,
                format!("axis direction {:?} is degenerate", axis.direction),
            ));
        }

        let shape = self.get_shape(OPERATION, base)?;
        let polygons = shape.world_polygons();
        if !polygons
            .iter()
            .any(|p| p.is_pierced_by(axis.origin, axis.direction))
        {
            return Err(CadError::geometry(
                OPERATION,
                format!("axis does not intersect solid {}", base.id),
            ));
        }

        // Through cylinder covering the whole solid along the axis
        let bounds = shape.bounds();
        let (low, high) = bounds
            .corners()
            .iter()
            .map(|c| axis.parameter_of(*c))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        let margin = (bounds.diagonal() * 0.1).max(self.config.tolerance * 10.0);
        let frame = Frame::new(axis.point_at(low - margin), axis.direction);
        let tool_polygons = primitives::build(
            &Primitive::cylinder(radius, high - low + 2.0 * margin),
            &self.config,
        )?;
        let tool = MeshShape::located(tool_polygons, frame.to_affine());

        let result = self
            .combine(&shape, &tool, BooleanType::Cut)
            .map_err(|message| CadError::geometry(OPERATION, format!("hole in {}: {}", base.id, message)))?;
        debug!(
            "Drilled radius {} hole through {} ({} facets)",
            radius,
            base.id,
            result.polygon_count()
        );
        Ok(self.store_shape(result))
    }

    fn fillet_2d(
        &self,
        first: &Edge,
        second: &Edge,
        radius: f64,
        plane: &Frame,
    ) -> CadResult<FilletResult> {
        sketch::fillet_lines(first, second, radius, plane, self.config.tolerance)
    }

    fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(CadError::invalid(
                "tessellate",
                format!("tolerance must be a positive number, got {}", tolerance),
            ));
        }
        // Facets are already planar; the tolerance cannot refine them further
        Ok(self.get_shape("tessellate", solid)?.tessellate())
    }

    fn mass_properties(&self, solid: &Solid) -> CadResult<MassProperties> {
        Ok(self.get_shape("measure", solid)?.mass_properties())
    }

    fn shares_topology(&self, a: &Solid, b: &Solid) -> bool {
        let shapes = self.shapes.read();
        match (shapes.get(&a.id), shapes.get(&b.id)) {
            (Some(a), Some(b)) => a.shares_topology(b),
            _ => false,
        }
    }

    fn release(&self, solid: &Solid) -> bool {
        self.shapes.write().remove(&solid.id).is_some()
    }
}
