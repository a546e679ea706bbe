//! Truck CAD Kernel Backend
//!
//! Pure Rust B-Rep kernel using the Truck library. Cylinders are exact;
//! spheres, tori and revolved profiles use polyline meridians.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DAffine3, DMat4, DVec3};
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use truck_meshalgo::prelude::*;
use truck_modeling::{Matrix4, Point3, Rad, Solid as TruckSolid, Vector3, Vertex, Wire, builder};

use super::mesh::{primitives, sweep};
use super::{
    BooleanType, CadError, CadKernel, CadResult, MassProperties, Primitive, Solid, TessellatedMesh,
};
use crate::config::KernelConfig;
use crate::geometry::{Aabb, Axis3D, Frame, Transform};
use crate::sketch::{self, Edge, FilletResult, Profile};

/// Tolerance handed to truck-shapeops; its intersection curves need a coarse value
const SHAPEOPS_TOLERANCE: f64 = 0.01;

/// Tessellation tolerance used for measurements and hit tests
const MEASURE_TOLERANCE: f64 = 0.005;

/// Rotation of the drill tool about its axis, so its seam never meets the base's
const TOOL_SEAM_OFFSET: f64 = 0.7;

#[derive(Clone)]
struct TruckShape {
    solid: Arc<TruckSolid>,
    location: DAffine3,
}

impl TruckShape {
    fn new(solid: TruckSolid) -> Self {
        Self {
            solid: Arc::new(solid),
            location: DAffine3::IDENTITY,
        }
    }

    /// The solid with its location applied
    fn world(&self) -> TruckSolid {
        if self.location.abs_diff_eq(DAffine3::IDENTITY, 0.0) {
            return self.solid.as_ref().clone();
        }
        builder::transformed(self.solid.as_ref(), to_matrix(&self.location))
    }
}

fn to_matrix(affine: &DAffine3) -> Matrix4 {
    Matrix4::from(DMat4::from(*affine).to_cols_array_2d())
}

fn point(p: DVec3) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn vector(v: DVec3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

/// Truck-based CAD kernel
pub struct TruckKernel {
    config: KernelConfig,
    /// Storage for solid data (keyed by UUID)
    solids: RwLock<HashMap<Uuid, TruckShape>>,
}

impl TruckKernel {
    /// Create a new Truck kernel
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Create a new Truck kernel with the given settings
    pub fn with_config(config: KernelConfig) -> Self {
        Self {
            config,
            solids: RwLock::new(HashMap::new()),
        }
    }

    /// Store a solid and return a Solid reference
    fn store(&self, shape: TruckShape) -> Solid {
        let id = Uuid::new_v4();
        self.solids.write().insert(id, shape);
        Solid::new(id)
    }

    /// Get a stored solid by ID
    fn get(&self, operation: &'static str, solid: &Solid) -> CadResult<TruckShape> {
        self.solids
            .read()
            .get(&solid.id)
            .cloned()
            .ok_or(CadError::SolidNotFound {
                operation,
                id: solid.id,
            })
    }

    /// Closed polyline wire through the loop points
    fn create_wire(&self, points: &[DVec3]) -> Wire {
        let vertices: Vec<Vertex> = points.iter().map(|p| builder::vertex(point(*p))).collect();
        let n = vertices.len();
        let edges: Vec<_> = (0..n)
            .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
            .collect();
        edges.into()
    }

    /// Flip a freshly swept solid whose faces point inwards
    fn outward(&self, mut solid: TruckSolid) -> TruckSolid {
        if measure(&self.triangles(&solid, MEASURE_TOLERANCE)).volume < 0.0 {
            solid.not();
        }
        solid
    }

    fn revolve_points(
        &self,
        points: &[DVec3],
        axis: &Axis3D,
        angle: f64,
    ) -> CadResult<TruckSolid> {
        let wire = self.create_wire(points);
        let face = builder::try_attach_plane(&[wire]).map_err(|e| {
            CadError::geometry("revolve", format!("failed to create face: {:?}", e))
        })?;
        Ok(self.outward(builder::rsweep(
            &face,
            point(axis.origin),
            vector(axis.direction),
            Rad(angle),
        )))
    }

    fn cylinder(&self, radius: f64, height: f64) -> CadResult<TruckSolid> {
        let vertex = builder::vertex(Point3::new(radius, 0.0, 0.0));
        let circle = builder::rsweep(
            &vertex,
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Rad(7.0),
        );
        let disk = builder::try_attach_plane(&[circle]).map_err(|e| {
            CadError::geometry("make_primitive", format!("failed to create face: {:?}", e))
        })?;
        Ok(self.outward(builder::tsweep(&disk, Vector3::new(0.0, 0.0, height))))
    }

    /// Regular prism inscribed in a cylinder, built from planar faces only
    fn prism(&self, radius: f64, height: f64) -> CadResult<TruckSolid> {
        let segments = self.config.circle_segments.max(3) as usize;
        let points: Vec<DVec3> = (0..segments)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / segments as f64;
                DVec3::new(radius * angle.cos(), radius * angle.sin(), 0.0)
            })
            .collect();
        let face = builder::try_attach_plane(&[self.create_wire(&points)]).map_err(|e| {
            CadError::geometry("drill_hole", format!("failed to create face: {:?}", e))
        })?;
        Ok(self.outward(builder::tsweep(&face, Vector3::new(0.0, 0.0, height))))
    }

    fn triangles(&self, solid: &TruckSolid, tolerance: f64) -> Vec<[DVec3; 3]> {
        let mesh = solid.triangulation(tolerance).to_polygon();
        let positions = mesh.positions();
        let at = |index: usize| {
            let p = positions[index];
            DVec3::new(p.x, p.y, p.z)
        };
        let mut triangles = Vec::new();
        for face in mesh.tri_faces() {
            triangles.push([at(face[0].pos), at(face[1].pos), at(face[2].pos)]);
        }
        for quad in mesh.quad_faces() {
            triangles.push([at(quad[0].pos), at(quad[1].pos), at(quad[2].pos)]);
            triangles.push([at(quad[0].pos), at(quad[2].pos), at(quad[3].pos)]);
        }
        triangles
    }

    fn run_boolean(
        &self,
        a: &TruckSolid,
        b: &TruckSolid,
        op: BooleanType,
    ) -> Result<TruckSolid, String> {
        let result = match op {
            BooleanType::Fuse => truck_shapeops::or(a, b, SHAPEOPS_TOLERANCE),
            BooleanType::Common => truck_shapeops::and(a, b, SHAPEOPS_TOLERANCE),
            BooleanType::Cut => {
                let mut inverted = b.clone();
                inverted.not();
                truck_shapeops::and(a, &inverted, SHAPEOPS_TOLERANCE)
            }
        };
        let solid = result.ok_or_else(|| "truck-shapeops found no result".to_string())?;
        let volume = measure(&self.triangles(&solid, MEASURE_TOLERANCE)).volume;
        if volume.abs() <= self.config.tolerance {
            return Err(format!("result has no volume ({:.3e})", volume));
        }
        Ok(solid)
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Volume, area, centroid and bounds of a closed triangle soup
fn measure(triangles: &[[DVec3; 3]]) -> MassProperties {
    let mut volume = 0.0;
    let mut moment = DVec3::ZERO;
    let mut surface_area = 0.0;
    for [a, b, c] in triangles {
        let v = a.dot(b.cross(*c)) / 6.0;
        volume += v;
        moment += (*a + *b + *c) * (v / 4.0);
        surface_area += (*b - *a).cross(*c - *a).length() * 0.5;
    }
    let bounds = Aabb::from_points(triangles.iter().flatten().copied());
    let centroid = if volume.abs() > f64::EPSILON {
        moment / volume
    } else {
        bounds.center()
    };
    MassProperties {
        volume,
        surface_area,
        centroid,
        bounds,
        face_count: triangles.len(),
    }
}

/// Whether the infinite line crosses the triangle
fn line_hits_triangle(origin: DVec3, direction: DVec3, [a, b, c]: &[DVec3; 3]) -> bool {
    let e1 = *b - *a;
    let e2 = *c - *a;
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-12 {
        return false;
    }
    let s = origin - *a;
    let u = s.dot(p) / det;
    let q = s.cross(e1);
    let v = direction.dot(q) / det;
    u >= -1e-9 && v >= -1e-9 && u + v <= 1.0 + 1e-9
}

impl CadKernel for TruckKernel {
    fn name(&self) -> &str {
        "truck"
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
        primitive.validate()?;
        let local = match *primitive {
            Primitive::Cylinder { radius, height } => self.cylinder(radius, height)?,
            _ => {
                let profile = primitives::meridian(primitive, &self.config);
                let points = profile.distinct_points(self.config.tolerance);
                self.revolve_points(&points, &Axis3D::z(), std::f64::consts::TAU)?
            }
        };
        debug!("Created {} at {:?}", primitive.kind(), frame.origin);
        Ok(self.store(TruckShape {
            solid: Arc::new(local),
            location: frame.to_affine(),
        }))
    }

    fn boolean(&self, a: &Solid, b: &Solid, op: BooleanType) -> CadResult<Solid> {
        let shape_a = self.get("boolean", a)?.world();
        let shape_b = self.get("boolean", b)?.world();
        let solid = self
            .run_boolean(&shape_a, &shape_b, op)
            .map_err(|message| CadError::BooleanOperation {
                op,
                a: a.id,
                b: b.id,
                message,
            })?;
        debug!("Boolean {} of {} and {}", op, a.id, b.id);
        Ok(self.store(TruckShape::new(solid)))
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
        let source = self.get("apply_transform", solid)?;
        let moved = TruckShape {
            solid: Arc::clone(&source.solid),
            location: transform.as_affine() * source.location,
        };
        let shape = if deep_copy {
            TruckShape::new(moved.world())
        } else {
            moved
        };
        Ok(self.store(shape))
    }

    fn revolve(&self, profile: &Profile, axis: &Axis3D, angle: f64) -> CadResult<Solid> {
        sweep::check_angle(angle)?;
        let frame = sweep::prepare(profile, axis, self.config.tolerance)?;
        let solid = self.revolve_points(&frame.points, axis, angle)?;
        debug!("Revolved profile {} by {:.4} rad", profile.id, angle);
        Ok(self.store(TruckShape::new(solid)))
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

        let solid = self.get(OPERATION, base)?.world();
        let triangles = self.triangles(&solid, MEASURE_TOLERANCE);
        if !triangles
            .iter()
            .any(|t| line_hits_triangle(axis.origin, axis.direction, t))
        {
            return Err(CadError::geometry(
                OPERATION,
                format!("axis does not intersect solid {}", base.id),
            ));
        }

        let bounds = measure(&triangles).bounds;
        let (low, high) = bounds
            .corners()
            .iter()
            .map(|c| axis.parameter_of(*c))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
        let margin = bounds.diagonal() * 0.1;
        let length = high - low + 2.0 * margin;
        let start = axis.point_at(low - margin);

        // Exact tool with its seam turned away from the base's, then a faceted fallback
        let seam_hint = Frame::new(start, axis.direction).x_direction;
        let turned = Transform::rotation(&Axis3D::new(start, axis.direction), TOOL_SEAM_OFFSET);
        let frame = Frame::with_x_direction(start, axis.direction, turned.apply_vector(seam_hint));
        let placement = to_matrix(&frame.to_affine());
        let exact = builder::transformed(&self.cylinder(radius, length)?, placement);
        let result = match self.run_boolean(&solid, &exact, BooleanType::Cut) {
            Ok(result) => result,
            Err(message) => {
                warn!("Exact drill tool failed ({}), retrying with a faceted tool", message);
                let faceted = builder::transformed(&self.prism(radius, length)?, placement);
                self.run_boolean(&solid, &faceted, BooleanType::Cut)
                    .map_err(|message| CadError::geometry(OPERATION, message))?
            }
        };
        debug!("Drilled radius {} hole through {}", radius, base.id);
        Ok(self.store(TruckShape::new(result)))
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
        let world = self.get("tessellate", solid)?.world();
        let mut mesh = TessellatedMesh::new();
        for [a, b, c] in self.triangles(&world, tolerance) {
            let normal = (b - a).cross(c - a).normalize_or_zero();
            mesh.push_triangle([a, b, c], normal);
        }
        Ok(mesh)
    }

    fn mass_properties(&self, solid: &Solid) -> CadResult<MassProperties> {
        let world = self.get("measure", solid)?.world();
        Ok(measure(&self.triangles(&world, MEASURE_TOLERANCE)))
    }

    fn shares_topology(&self, a: &Solid, b: &Solid) -> bool {
        let solids = self.solids.read();
        match (solids.get(&a.id), solids.get(&b.id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a.solid, &b.solid),
            _ => false,
        }
    }

    fn release(&self, solid: &Solid) -> bool {
        self.solids.write().remove(&solid.id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_truck_cylinder_volume() {
        let kernel = TruckKernel::new();
        let solid = kernel
            .create_primitive(&Frame::world(), &Primitive::cylinder(1.0, 2.0))
            .unwrap();
        let props = kernel.mass_properties(&solid).unwrap();
        assert_relative_eq!(props.volume, 2.0 * PI, max_relative = 2e-2);
    }

    #[test]
    fn test_truck_shallow_transform_shares() {
        let kernel = TruckKernel::new();
        let solid = kernel
            .create_primitive(&Frame::world(), &Primitive::cylinder(1.0, 2.0))
            .unwrap();
        let moved = kernel
            .transform(&solid, &Transform::translation(DVec3::X), false)
            .unwrap();
        assert!(kernel.shares_topology(&solid, &moved));
    }

    fn cylinder_at(kernel: &TruckKernel, origin: DVec3, radius: f64, height: f64) -> Solid {
        kernel
            .create_primitive(&Frame::at(origin), &Primitive::cylinder(radius, height))
            .unwrap()
    }

    #[test]
    fn test_truck_revolve_is_outward() {
        let kernel = TruckKernel::new();
        let profile = Profile::polygon(vec![
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 1.0),
        ]);
        let solid = kernel
            .revolve(&profile, &Axis3D::z(), std::f64::consts::TAU)
            .unwrap();
        let props = kernel.mass_properties(&solid).unwrap();
        assert_relative_eq!(props.volume, 3.0 * PI, max_relative = 2e-2);

        // Same ring, opposite winding
        let reversed = Profile::polygon(vec![
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::new(2.0, 0.0, 1.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
        ]);
        let solid = kernel
            .revolve(&reversed, &Axis3D::z(), std::f64::consts::TAU)
            .unwrap();
        let props = kernel.mass_properties(&solid).unwrap();
        assert_relative_eq!(props.volume, 3.0 * PI, max_relative = 2e-2);
    }

    #[test]
    fn test_truck_zone_and_torus_are_outward() {
        let kernel = TruckKernel::new();
        let angle = 0.5_f64.atan();
        let zone = kernel
            .create_primitive(&Frame::world(), &Primitive::sphere_zone(1.0, -angle, angle))
            .unwrap();
        let h = angle.sin();
        let exact = PI * (2.0 * h - 2.0 * h.powi(3) / 3.0);
        let props = kernel.mass_properties(&zone).unwrap();
        assert_relative_eq!(props.volume, exact, max_relative = 2e-2);

        let torus = kernel
            .create_primitive(&Frame::world(), &Primitive::torus(1.0, 0.25))
            .unwrap();
        let props = kernel.mass_properties(&torus).unwrap();
        assert_relative_eq!(props.volume, 2.0 * PI * PI * 0.0625, max_relative = 3e-2);
    }

    #[test]
    fn test_truck_booleans_of_offset_cylinders() {
        let kernel = TruckKernel::new();
        let a = cylinder_at(&kernel, DVec3::ZERO, 1.0, 2.0);
        let b = cylinder_at(&kernel, DVec3::new(0.5, 0.0, 0.5), 1.0, 2.0);
        let single = kernel.mass_properties(&a).unwrap().volume;

        let cut = kernel.boolean(&a, &b, BooleanType::Cut).unwrap();
        let fuse = kernel.boolean(&a, &b, BooleanType::Fuse).unwrap();
        let common = kernel.boolean(&a, &b, BooleanType::Common).unwrap();
        let cut = kernel.mass_properties(&cut).unwrap().volume;
        let fuse = kernel.mass_properties(&fuse).unwrap().volume;
        let common = kernel.mass_properties(&common).unwrap().volume;

        assert!(cut > 0.0 && cut < single, "cut {}", cut);
        assert!(common > 0.0 && common < single, "common {}", common);
        assert!(fuse > single, "fuse {}", fuse);
        assert_relative_eq!(cut + common, single, max_relative = 2e-2);
        assert_relative_eq!(fuse, 2.0 * single - common, max_relative = 2e-2);
    }

    #[test]
    fn test_truck_drill_hole_through_cylinder() {
        let kernel = TruckKernel::new();
        let base = cylinder_at(&kernel, DVec3::ZERO, 1.0, 2.0);
        let drilled = kernel.drill_hole(&base, &Axis3D::z(), 0.4).unwrap();
        let props = kernel.mass_properties(&drilled).unwrap();
        // Faceted fallback removes slightly less than the exact hole
        let exact = 2.0 * PI * (1.0 - 0.16);
        assert_relative_eq!(props.volume, exact, max_relative = 3e-2);
    }

    #[test]
    fn test_truck_drill_hole_misses() {
        let kernel = TruckKernel::new();
        let base = cylinder_at(&kernel, DVec3::ZERO, 1.0, 2.0);
        let axis = Axis3D::new(DVec3::new(3.0, 0.0, 0.0), DVec3::Z);
        let result = kernel.drill_hole(&base, &axis, 0.4);
        assert!(matches!(
            result,
            Err(CadError::Geometry { operation: "drill_hole", .. })
        ));
    }

    #[test]
    fn test_line_hits_triangle() {
        let tri = [DVec3::ZERO, DVec3::X, DVec3::Y];
        assert!(line_hits_triangle(DVec3::new(0.2, 0.2, 5.0), DVec3::Z, &tri));
        assert!(!line_hits_triangle(DVec3::new(2.0, 2.0, 5.0), DVec3::Z, &tri));
    }
}
