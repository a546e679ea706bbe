//! Shape construction pipeline
//!
//! [`ShapeBuilder`] sequences kernel calls into the modelling steps used by
//! the demos: primitives, holes, transforms, booleans, revolutions and radial
//! patterns. It holds no shape state of its own; every step returns a new
//! [`Solid`] owned by the kernel.

use std::f64::consts::TAU;

use tracing::{debug, info};

use crate::config::DEFAULT_TOLERANCE;
use crate::geometry::{Axis3D, Frame, Transform};
use crate::kernel::{
    BooleanType, CadError, CadKernel, CadResult, MassProperties, Primitive, Solid, TessellatedMesh,
};
use crate::sketch::{Edge, FilletResult, Profile, Wire};

/// Facade over a [`CadKernel`]
#[derive(Clone, Copy)]
pub struct ShapeBuilder<'k> {
    kernel: &'k dyn CadKernel,
    tolerance: f64,
}

impl<'k> ShapeBuilder<'k> {
    pub fn new(kernel: &'k dyn CadKernel) -> Self {
        Self {
            kernel,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Use `tolerance` when joining edges into wires
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The kernel every step runs on
    pub fn kernel(&self) -> &'k dyn CadKernel {
        self.kernel
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Create a primitive solid positioned by `frame`
    pub fn make_primitive(&self, frame: &Frame, primitive: &Primitive) -> CadResult<Solid> {
        primitive.validate()?;
        let solid = self.kernel.create_primitive(frame, primitive)?;
        debug!("make_primitive: {} -> {}", primitive.kind(), solid);
        Ok(solid)
    }

    /// Drill a through hole of `diameter` along `axis`
    pub fn drill_hole(&self, base: &Solid, axis: &Axis3D, diameter: f64) -> CadResult<Solid> {
        if !diameter.is_finite() || diameter <= 0.0 {
            return Err(CadError::InvalidParameter {
                operation: "drill_hole",
                message: format!(
                    "diameter must be a positive number, got {} (base {})",
                    diameter, base
                ),
            });
        }
        if !axis.is_valid() {
            return Err(CadError::InvalidParameter {
                operation: "drill_hole",
                message: format!(
                    "axis direction {:?} is degenerate (base {})",
                    axis.direction, base
                ),
            });
        }
        let solid = self.kernel.drill_hole(base, axis, diameter * 0.5)?;
        debug!("drill_hole: {} with diameter {} -> {}", base, diameter, solid);
        Ok(solid)
    }

    /// Place a copy of `shape` under `transform`
    ///
    /// Without `deep_copy` the result shares topology with `shape`.
    pub fn apply_transform(
        &self,
        shape: &Solid,
        transform: &Transform,
        deep_copy: bool,
    ) -> CadResult<Solid> {
        let solid = self.kernel.transform(shape, transform, deep_copy)?;
        debug!(
            "apply_transform: {} -> {} (deep copy: {})",
            shape, solid, deep_copy
        );
        Ok(solid)
    }

    /// Combine two solids
    pub fn boolean_combine(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let solid = self.kernel.boolean(a, b, op)?;
        debug!("boolean_combine: {} {} {} -> {}", a, op, b, solid);
        Ok(solid)
    }

    /// Revolve a closed profile a full turn about `axis`
    pub fn revolve_profile(&self, profile: &Profile, axis: &Axis3D) -> CadResult<Solid> {
        self.revolve_profile_by(profile, axis, TAU)
    }

    /// Revolve a closed profile by `angle` radians about `axis`
    pub fn revolve_profile_by(
        &self,
        profile: &Profile,
        axis: &Axis3D,
        angle: f64,
    ) -> CadResult<Solid> {
        if !profile.is_closed(self.tolerance) {
            return Err(CadError::OpenProfile {
                profile: profile.id,
                gap: profile.closure_gap(),
            });
        }
        let solid = self.kernel.revolve(profile, axis, angle)?;
        debug!(
            "revolve_profile: profile {} by {:.4} rad -> {}",
            profile.id, angle, solid
        );
        Ok(solid)
    }

    /// Apply `count` rotated copies of `tool` to `base` around world Z
    pub fn repeated_radial_pattern(
        &self,
        base: &Solid,
        tool: &Solid,
        count: usize,
        op: BooleanType,
    ) -> CadResult<Solid> {
        self.repeated_radial_pattern_about(base, tool, &Axis3D::z(), count, op)
    }

    /// Apply `count` rotated copies of `tool` to `base` around `axis`
    ///
    /// Copy `i` is `tool` rotated by `i * 2π / count`, deep-copied, and
    /// combined into the running result in index order. Superseded copies
    /// and intermediate results are released; `base` and `tool` are not.
    pub fn repeated_radial_pattern_about(
        &self,
        base: &Solid,
        tool: &Solid,
        axis: &Axis3D,
        count: usize,
        op: BooleanType,
    ) -> CadResult<Solid> {
        if count == 0 {
            return Err(CadError::InvalidParameter {
                operation: "repeated_radial_pattern",
                message: format!("count must be at least 1 (base {}, tool {})", base, tool),
            });
        }
        if !axis.is_valid() {
            return Err(CadError::InvalidParameter {
                operation: "repeated_radial_pattern",
                message: format!("axis direction {:?} is degenerate", axis.direction),
            });
        }

        let step = TAU / count as f64;
        let mut current = base.clone();
        for i in 0..count {
            let rotation = Transform::rotation(axis, step * i as f64);
            let next = self
                .kernel
                .transform(tool, &rotation, true)
                .and_then(|copy| {
                    let combined = self.kernel.boolean(&current, &copy, op);
                    self.kernel.release(&copy);
                    combined
                });
            if current != *base {
                self.kernel.release(&current);
            }
            current = next?;
            debug!("repeated_radial_pattern: step {}/{} -> {}", i + 1, count, current);
        }

        info!(
            "Applied {} x {} of {} to {} -> {}",
            count, op, tool, base, current
        );
        Ok(current)
    }

    /// Round the corner between two line edges on `plane`
    pub fn fillet_corner(
        &self,
        first: &Edge,
        second: &Edge,
        radius: f64,
        plane: &Frame,
    ) -> CadResult<FilletResult> {
        let result = self.kernel.fillet_2d(first, second, radius, plane)?;
        debug!("fillet_corner: radius {}", radius);
        Ok(result)
    }

    /// Chain edges into a wire
    pub fn make_wire(&self, edges: Vec<Edge>) -> CadResult<Wire> {
        Wire::from_edges(edges, self.tolerance)
    }

    /// Volume, area, centroid and bounds of a solid
    pub fn measure(&self, solid: &Solid) -> CadResult<MassProperties> {
        self.kernel.mass_properties(solid)
    }

    /// Triangulate a solid for display
    pub fn tessellate(&self, solid: &Solid, tolerance: f64) -> CadResult<TessellatedMesh> {
        self.kernel.tessellate(solid, tolerance)
    }
}
