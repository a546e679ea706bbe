//! Planes and convex polygons for BSP clipping

use glam::{DAffine3, DVec3};

/// Distance within which a point counts as lying on a plane
pub(crate) const PLANE_EPSILON: f64 = 1e-5;

/// Consecutive vertices closer than this are merged
const VERTEX_EPSILON: f64 = 1e-10;

/// Classification of a point or polygon relative to a plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Classification {
    Coplanar,
    Front,
    Back,
    Spanning,
}

/// An oriented plane `normal · p = w`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Plane {
    pub normal: DVec3,
    pub w: f64,
}

impl Plane {
    /// Plane through `point` with unit `normal`
    pub fn new(normal: DVec3, point: DVec3) -> Self {
        Self {
            normal,
            w: normal.dot(point),
        }
    }

    /// The same plane facing the other way
    pub fn flip(&self) -> Plane {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Positive in front, negative behind
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.w
    }

    pub fn classify_point(&self, point: DVec3) -> Classification {
        let distance = self.signed_distance(point);
        if distance > PLANE_EPSILON {
            Classification::Front
        } else if distance < -PLANE_EPSILON {
            Classification::Back
        } else {
            Classification::Coplanar
        }
    }
}

/// A convex planar polygon, vertices counter-clockwise seen from the front
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polygon {
    vertices: Vec<DVec3>,
    plane: Plane,
}

/// Output buckets for [`Polygon::split`]
#[derive(Debug, Default)]
pub(crate) struct SplitBuckets {
    pub coplanar_front: Vec<Polygon>,
    pub coplanar_back: Vec<Polygon>,
    pub front: Vec<Polygon>,
    pub back: Vec<Polygon>,
}

impl Polygon {
    /// Build a polygon, taking its plane from the vertex winding
    ///
    /// Returns `None` for fewer than three distinct vertices or zero area.
    pub fn new(vertices: Vec<DVec3>) -> Option<Self> {
        let vertices = dedup_vertices(vertices);
        if vertices.len() < 3 {
            return None;
        }
        let normal = newell_normal(&vertices);
        let length = normal.length();
        if length < 1e-12 {
            return None;
        }
        let normal = normal / length;
        let plane = Plane::new(normal, vertices[0]);
        Some(Self { vertices, plane })
    }

    /// Build a fragment that keeps its parent's plane
    fn with_plane(vertices: Vec<DVec3>, plane: Plane) -> Option<Self> {
        let vertices = dedup_vertices(vertices);
        (vertices.len() >= 3).then_some(Self { vertices, plane })
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Reverse winding and plane
    pub fn flip(&mut self) {
        self.vertices.reverse();
        self.plane = self.plane.flip();
    }

    /// Copy moved by a rigid transform
    pub fn transformed(&self, affine: &DAffine3) -> Polygon {
        let vertices: Vec<DVec3> = self
            .vertices
            .iter()
            .map(|v| affine.transform_point3(*v))
            .collect();
        let normal = affine.transform_vector3(self.plane.normal).normalize();
        let plane = Plane::new(normal, vertices[0]);
        Polygon { vertices, plane }
    }

    pub fn classify(&self, plane: &Plane) -> Classification {
        let mut front = false;
        let mut back = false;
        for v in &self.vertices {
            match plane.classify_point(*v) {
                Classification::Front => front = true,
                Classification::Back => back = true,
                _ => {}
            }
        }
        match (front, back) {
            (true, true) => Classification::Spanning,
            (true, false) => Classification::Front,
            (false, true) => Classification::Back,
            (false, false) => Classification::Coplanar,
        }
    }

    /// Sort this polygon into `buckets`, splitting it if it spans `plane`
    pub fn split(self, plane: &Plane, buckets: &mut SplitBuckets) {
        match self.classify(plane) {
            Classification::Coplanar => {
                if self.plane.normal.dot(plane.normal) > 0.0 {
                    buckets.coplanar_front.push(self);
                } else {
                    buckets.coplanar_back.push(self);
                }
            }
            Classification::Front => buckets.front.push(self),
            Classification::Back => buckets.back.push(self),
            Classification::Spanning => {
                let n = self.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);

                for i in 0..n {
                    let vi = self.vertices[i];
                    let vj = self.vertices[(i + 1) % n];
                    let ti = plane.classify_point(vi);
                    let tj = plane.classify_point(vj);

                    if ti != Classification::Back {
                        front.push(vi);
                    }
                    if ti != Classification::Front {
                        back.push(vi);
                    }

                    let crosses = matches!(
                        (ti, tj),
                        (Classification::Front, Classification::Back)
                            | (Classification::Back, Classification::Front)
                    );
                    if crosses {
                        let di = plane.signed_distance(vi);
                        let dj = plane.signed_distance(vj);
                        let point = vi.lerp(vj, di / (di - dj));
                        front.push(point);
                        back.push(point);
                    }
                }

                if let Some(polygon) = Polygon::with_plane(front, self.plane) {
                    buckets.front.push(polygon);
                }
                if let Some(polygon) = Polygon::with_plane(back, self.plane) {
                    buckets.back.push(polygon);
                }
            }
        }
    }

    /// Fan triangulation
    pub fn triangles(&self) -> impl Iterator<Item = [DVec3; 3]> + '_ {
        let v0 = self.vertices[0];
        self.vertices
            .windows(2)
            .skip(1)
            .map(move |w| [v0, w[0], w[1]])
    }

    pub fn area(&self) -> f64 {
        newell_normal(&self.vertices).length() * 0.5
    }

    /// Whether the line `origin + t·direction` passes through the polygon
    pub fn is_pierced_by(&self, origin: DVec3, direction: DVec3) -> bool {
        let normal = self.plane.normal;
        let denom = normal.dot(direction);
        if denom.abs() < 1e-12 {
            return false;
        }
        let t = (self.plane.w - normal.dot(origin)) / denom;
        let hit = origin + direction * t;
        let n = self.vertices.len();
        (0..n).all(|i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            (b - a).cross(hit - a).dot(normal) >= -PLANE_EPSILON * (b - a).length()
        })
    }
}

/// Un-normalized polygon normal (twice the area vector)
fn newell_normal(vertices: &[DVec3]) -> DVec3 {
    let n = vertices.len();
    (0..n).fold(DVec3::ZERO, |acc, i| {
        acc + vertices[i].cross(vertices[(i + 1) % n])
    })
}

fn dedup_vertices(mut vertices: Vec<DVec3>) -> Vec<DVec3> {
    vertices.dedup_by(|b, a| a.distance_squared(*b) < VERTEX_EPSILON * VERTEX_EPSILON);
    while vertices.len() > 1 {
        let (first, last) = (vertices[0], vertices[vertices.len() - 1]);
        if first.distance_squared(last) >= VERTEX_EPSILON * VERTEX_EPSILON {
            break;
        }
        vertices.pop();
    }
    vertices
}
