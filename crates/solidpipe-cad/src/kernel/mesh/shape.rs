//! Located polygon shapes

use std::sync::Arc;

use glam::{DAffine3, DVec3};

use super::polygon::Polygon;
use crate::geometry::Aabb;
use crate::kernel::{MassProperties, TessellatedMesh};

/// A closed polygon soup placed in the world by a rigid location
///
/// Several shapes may point at one topology with different locations; that
/// is what a transform without deep copy produces.
#[derive(Debug, Clone)]
pub(crate) struct MeshShape {
    topology: Arc<Vec<Polygon>>,
    location: DAffine3,
}

impl MeshShape {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self::located(polygons, DAffine3::IDENTITY)
    }

    pub fn located(polygons: Vec<Polygon>, location: DAffine3) -> Self {
        Self {
            topology: Arc::new(polygons),
            location,
        }
    }

    /// Same topology under an additional placement
    pub fn moved(&self, transform: DAffine3) -> Self {
        Self {
            topology: Arc::clone(&self.topology),
            location: transform * self.location,
        }
    }

    /// Independent copy with the location baked into the polygons
    pub fn baked(&self) -> Self {
        Self::new(self.world_polygons())
    }

    pub fn shares_topology(&self, other: &MeshShape) -> bool {
        Arc::ptr_eq(&self.topology, &other.topology)
    }

    pub fn polygon_count(&self) -> usize {
        self.topology.len()
    }

    /// Polygons in world coordinates
    pub fn world_polygons(&self) -> Vec<Polygon> {
        if self.location.abs_diff_eq(DAffine3::IDENTITY, 0.0) {
            return self.topology.as_ref().clone();
        }
        self.topology
            .iter()
            .map(|polygon| polygon.transformed(&self.location))
            .collect()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.topology
                .iter()
                .flat_map(|polygon| polygon.vertices().iter())
                .map(|v| self.location.transform_point3(*v)),
        )
    }

    pub fn mass_properties(&self) -> MassProperties {
        let polygons = self.world_polygons();
        let mut volume = 0.0;
        let mut moment = DVec3::ZERO;
        let mut surface_area = 0.0;
        for polygon in &polygons {
            surface_area += polygon.area();
            for [a, b, c] in polygon.triangles() {
                let v = a.dot(b.cross(c)) / 6.0;
                volume += v;
                moment += (a + b + c) * (v / 4.0);
            }
        }
        let bounds = Aabb::from_points(polygons.iter().flat_map(|p| p.vertices().iter().copied()));
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
            face_count: polygons.len(),
        }
    }

    /// Flat-shaded triangles of every facet
    pub fn tessellate(&self) -> TessellatedMesh {
        let mut mesh = TessellatedMesh::new();
        for polygon in self.world_polygons() {
            let normal = polygon.plane().normal;
            for triangle in polygon.triangles() {
                mesh.push_triangle(triangle, normal);
            }
        }
        mesh
    }
}

/// Enclosed volume of a closed, outward-oriented polygon soup
pub(crate) fn signed_volume(polygons: &[Polygon]) -> f64 {
    polygons
        .iter()
        .flat_map(|polygon| polygon.triangles())
        .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Tetrahedron with one corner at the origin
    fn tetra() -> Vec<Polygon> {
        let o = DVec3::ZERO;
        let (x, y, z) = (DVec3::X, DVec3::Y, DVec3::Z);
        [[o, y, x], [o, x, z], [o, z, y], [x, y, z]]
            .into_iter()
            .filter_map(|f| Polygon::new(f.to_vec()))
            .collect()
    }

    #[test]
    fn test_tetra_mass_properties() {
        let shape = MeshShape::new(tetra());
        let props = shape.mass_properties();
        assert_abs_diff_eq!(props.volume, 1.0 / 6.0, epsilon = 1e-12);
        assert!(props.centroid.abs_diff_eq(DVec3::splat(0.25), 1e-12));
        assert_abs_diff_eq!(props.surface_area, 1.5 + 3f64.sqrt() / 2.0, epsilon = 1e-12);
        assert_eq!(props.face_count, 4);
    }

    #[test]
    fn test_moved_shares_topology() {
        let shape = MeshShape::new(tetra());
        let offset = DVec3::new(2.0, 0.0, 0.0);
        let moved = shape.moved(DAffine3::from_translation(offset));
        assert!(moved.shares_topology(&shape));

        let props = moved.mass_properties();
        assert_abs_diff_eq!(props.volume, 1.0 / 6.0, epsilon = 1e-12);
        assert!(props.centroid.abs_diff_eq(DVec3::splat(0.25) + offset, 1e-12));
        assert!(moved.bounds().min.abs_diff_eq(offset, 1e-12));

        let baked = moved.baked();
        assert!(!baked.shares_topology(&moved));
        assert!(baked.bounds().min.abs_diff_eq(offset, 1e-12));
    }

    #[test]
    fn test_tessellate_counts() {
        let mesh = MeshShape::new(tetra()).tessellate();
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.vertices.len(), 12);
        assert_eq!(mesh.normals.len(), 12);
    }
}
