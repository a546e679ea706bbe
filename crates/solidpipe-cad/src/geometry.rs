//! Geometric value types
//!
//! Axes, axis systems, rigid transforms and bounding boxes. These are plain
//! values: they are copied freely and never reference kernel state.

use glam::{DAffine3, DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// A line in 3D space: a point and a unit direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis3D {
    /// Origin point of the axis
    pub origin: DVec3,
    /// Direction of the axis (normalized, zero if the input was degenerate)
    pub direction: DVec3,
}

impl Axis3D {
    /// Create an axis from origin and direction
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// X axis at origin
    pub fn x() -> Self {
        Self::new(DVec3::ZERO, DVec3::X)
    }

    /// Y axis at origin
    pub fn y() -> Self {
        Self::new(DVec3::ZERO, DVec3::Y)
    }

    /// Z axis at origin
    pub fn z() -> Self {
        Self::new(DVec3::ZERO, DVec3::Z)
    }

    /// Whether origin and direction are finite and the direction is a unit vector
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite()
            && self.direction.is_finite()
            && (self.direction.length() - 1.0).abs() < 1e-9
    }

    /// Point at parameter `t` along the axis
    pub fn point_at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Parameter of the orthogonal projection of `point` onto the axis
    pub fn parameter_of(&self, point: DVec3) -> f64 {
        (point - self.origin).dot(self.direction)
    }

    /// Distance from `point` to the axis line
    pub fn distance_to(&self, point: DVec3) -> f64 {
        let foot = self.point_at(self.parameter_of(point));
        point.distance(foot)
    }
}

/// A right-handed axis system: origin, main direction and X direction
///
/// Positions primitives (the main direction is the local Z axis) and doubles
/// as a sketch plane (the plane through `origin` normal to `direction`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Origin of the axis system
    pub origin: DVec3,
    /// Main direction (local Z)
    pub direction: DVec3,
    /// X direction, perpendicular to the main direction
    pub x_direction: DVec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::world()
    }
}

impl Frame {
    /// Create a frame with an automatically chosen X direction
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        let direction = direction.normalize_or_zero();
        Self {
            origin,
            direction,
            x_direction: reference_x(direction),
        }
    }

    /// Create a frame whose X direction is `x_hint` made perpendicular to `direction`
    pub fn with_x_direction(origin: DVec3, direction: DVec3, x_hint: DVec3) -> Self {
        let direction = direction.normalize_or_zero();
        let x = (x_hint - direction * x_hint.dot(direction)).normalize_or_zero();
        let x_direction = if x == DVec3::ZERO {
            reference_x(direction)
        } else {
            x
        };
        Self {
            origin,
            direction,
            x_direction,
        }
    }

    /// The world axis system (XY plane)
    pub fn world() -> Self {
        Self {
            origin: DVec3::ZERO,
            direction: DVec3::Z,
            x_direction: DVec3::X,
        }
    }

    /// World axes moved to `origin`
    pub fn at(origin: DVec3) -> Self {
        Self {
            origin,
            ..Self::world()
        }
    }

    /// Y direction completing the right-handed system
    pub fn y_direction(&self) -> DVec3 {
        self.direction.cross(self.x_direction)
    }

    /// Whether the frame has finite components and orthonormal axes
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite()
            && self.direction.is_finite()
            && self.x_direction.is_finite()
            && (self.direction.length() - 1.0).abs() < 1e-9
            && (self.x_direction.length() - 1.0).abs() < 1e-9
            && self.direction.dot(self.x_direction).abs() < 1e-9
    }

    /// Local-to-world placement
    pub fn to_affine(&self) -> DAffine3 {
        DAffine3::from_cols(
            self.x_direction,
            self.y_direction(),
            self.direction,
            self.origin,
        )
    }

    /// Lift a point given in plane coordinates onto the plane
    pub fn lift(&self, point: DVec2) -> DVec3 {
        self.origin + self.x_direction * point.x + self.y_direction() * point.y
    }

    /// Plane coordinates of the orthogonal projection of `point`
    pub fn project(&self, point: DVec3) -> DVec2 {
        let d = point - self.origin;
        DVec2::new(d.dot(self.x_direction), d.dot(self.y_direction()))
    }

    /// Signed distance from `point` to the plane
    pub fn distance_to_plane(&self, point: DVec3) -> f64 {
        (point - self.origin).dot(self.direction)
    }
}

/// X direction for a frame when none is given
fn reference_x(direction: DVec3) -> DVec3 {
    let up = if direction.z.abs() < 0.9 {
        DVec3::Z
    } else {
        DVec3::Y
    };
    up.cross(direction).normalize_or_zero()
}

/// A rigid transformation (rotation followed by translation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    affine: DAffine3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        affine: DAffine3::IDENTITY,
    };

    /// The identity transform
    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Pure translation
    pub fn translation(offset: DVec3) -> Self {
        Self {
            affine: DAffine3::from_translation(offset),
        }
    }

    /// Translation that moves `from` onto `to`
    pub fn translation_between(from: DVec3, to: DVec3) -> Self {
        Self::translation(to - from)
    }

    /// Rotation by `angle` radians around `axis` (right-hand rule)
    pub fn rotation(axis: &Axis3D, angle: f64) -> Self {
        let rotation = DQuat::from_axis_angle(axis.direction, angle);
        let offset = axis.origin - rotation * axis.origin;
        Self {
            affine: DAffine3::from_rotation_translation(rotation, offset),
        }
    }

    /// Apply `self` first, then `next`
    pub fn then(&self, next: &Transform) -> Self {
        Self {
            affine: next.affine * self.affine,
        }
    }

    /// The inverse transform
    pub fn inverse(&self) -> Self {
        Self {
            affine: self.affine.inverse(),
        }
    }

    /// Transform a point
    pub fn apply_point(&self, point: DVec3) -> DVec3 {
        self.affine.transform_point3(point)
    }

    /// Transform a direction (ignores translation)
    pub fn apply_vector(&self, vector: DVec3) -> DVec3 {
        self.affine.transform_vector3(vector)
    }

    /// The translation component
    pub fn translation_part(&self) -> DVec3 {
        self.affine.translation
    }

    /// Underlying affine matrix
    pub fn as_affine(&self) -> DAffine3 {
        self.affine
    }

    /// Whether this is (numerically) the identity
    pub fn is_identity(&self) -> bool {
        self.affine.abs_diff_eq(DAffine3::IDENTITY, 1e-12)
    }

    /// Whether all components are finite
    pub fn is_finite(&self) -> bool {
        self.affine.is_finite()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// A box containing nothing
    pub fn empty() -> Self {
        Self {
            min: DVec3::INFINITY,
            max: DVec3::NEG_INFINITY,
        }
    }

    /// Smallest box containing all `points`
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.include(p);
        }
        bbox
    }

    /// Grow the box to contain `point`
    pub fn include(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Whether the box contains nothing
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Edge lengths
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Center point
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        self.size().length()
    }

    /// Whether `point` lies inside the box (inclusive, with slack `tolerance`)
    pub fn contains(&self, point: DVec3, tolerance: f64) -> bool {
        !self.is_empty()
            && point.cmpge(self.min - DVec3::splat(tolerance)).all()
            && point.cmple(self.max + DVec3::splat(tolerance)).all()
    }

    /// The eight corners
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_eq(a: DVec3, b: DVec3) {
        assert!(a.abs_diff_eq(b, 1e-9), "{a:?} != {b:?}");
    }

    #[test]
    fn test_axis_normalizes_direction() {
        let axis = Axis3D::new(DVec3::ZERO, DVec3::new(0.0, 0.0, 5.0));
        assert_vec_eq(axis.direction, DVec3::Z);
        assert!(axis.is_valid());
        assert!(!Axis3D::new(DVec3::ZERO, DVec3::ZERO).is_valid());
    }

    #[test]
    fn test_axis_distance() {
        let axis = Axis3D::z();
        assert_abs_diff_eq!(axis.distance_to(DVec3::new(3.0, 4.0, 7.0)), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(axis.parameter_of(DVec3::new(3.0, 4.0, 7.0)), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_world_frame_is_identity() {
        let frame = Frame::new(DVec3::ZERO, DVec3::Z);
        assert_vec_eq(frame.x_direction, DVec3::X);
        assert_vec_eq(frame.y_direction(), DVec3::Y);
        assert!(frame.to_affine().abs_diff_eq(DAffine3::IDENTITY, 1e-12));
    }

    #[test]
    fn test_frame_is_orthonormal_for_any_direction() {
        for dir in [DVec3::X, DVec3::Y, DVec3::new(1.0, 2.0, 3.0), -DVec3::Z] {
            let frame = Frame::new(DVec3::new(1.0, 2.0, 3.0), dir);
            assert!(frame.is_valid(), "frame for {dir:?} is not orthonormal");
        }
    }

    #[test]
    fn test_frame_lift_and_project() {
        let frame = Frame::with_x_direction(DVec3::new(0.0, 0.0, 2.0), DVec3::Z, DVec3::X);
        let p = frame.lift(DVec2::new(1.5, -0.5));
        assert_vec_eq(p, DVec3::new(1.5, -0.5, 2.0));
        assert!(frame.project(p).abs_diff_eq(DVec2::new(1.5, -0.5), 1e-12));
        assert_abs_diff_eq!(frame.distance_to_plane(DVec3::new(0.0, 0.0, 5.0)), 3.0);
    }

    #[test]
    fn test_rotation_about_offset_axis() {
        let axis = Axis3D::new(DVec3::new(1.0, 0.0, 0.0), DVec3::Z);
        let t = Transform::rotation(&axis, FRAC_PI_2);
        assert_vec_eq(t.apply_point(DVec3::new(2.0, 0.0, 0.0)), DVec3::new(1.0, 1.0, 0.0));
        assert_vec_eq(t.apply_point(axis.origin), axis.origin);
    }

    #[test]
    fn test_then_applies_in_order() {
        let rotate = Transform::rotation(&Axis3D::z(), FRAC_PI_2);
        let shift = Transform::translation(DVec3::X);
        let combined = rotate.then(&shift);
        assert_vec_eq(combined.apply_point(DVec3::X), DVec3::new(1.0, 1.0, 0.0));
        assert!(combined.then(&combined.inverse()).is_identity());
    }

    #[test]
    fn test_translation_between() {
        let t = Transform::translation_between(DVec3::ZERO, DVec3::new(0.0, 0.0, 0.5_f64.sin()));
        assert_abs_diff_eq!(t.translation_part().z, 0.5_f64.sin());
        assert_vec_eq(t.apply_vector(DVec3::X), DVec3::X);
    }

    #[test]
    fn test_aabb() {
        let mut bbox = Aabb::empty();
        assert!(bbox.is_empty());
        assert_eq!(bbox.size(), DVec3::ZERO);
        bbox.include(DVec3::new(-1.0, 0.0, 2.0));
        bbox.include(DVec3::new(1.0, 3.0, -2.0));
        assert!(!bbox.is_empty());
        assert_vec_eq(bbox.size(), DVec3::new(2.0, 3.0, 4.0));
        assert_vec_eq(bbox.center(), DVec3::new(0.0, 1.5, 0.0));
        assert!(bbox.contains(DVec3::new(0.0, 1.0, 0.0), 0.0));
        assert!(!bbox.contains(DVec3::new(0.0, 4.0, 0.0), 0.5));
        assert_eq!(bbox.corners().len(), 8);
    }
}
