//! Analytic 2D fillet between two straight edges

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::Edge;
use crate::geometry::Frame;
use crate::kernel::{CadError, CadResult};

/// Trimmed edges and the connecting arc produced by a fillet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilletResult {
    /// First edge, trimmed back to the arc
    pub first: Edge,
    /// Tangent arc from the first edge to the second
    pub arc: Edge,
    /// Second edge, trimmed back to the arc
    pub second: Edge,
}

impl FilletResult {
    /// The three edges in chain order
    pub fn edges(&self) -> Vec<Edge> {
        vec![self.first, self.arc, self.second]
    }
}

/// Round the corner shared by two line edges lying on `plane`
///
/// Each trimmed edge keeps its original direction. The arc runs from the
/// tangent point on `first` to the tangent point on `second`.
pub fn fillet_lines(
    first: &Edge,
    second: &Edge,
    radius: f64,
    plane: &Frame,
    tolerance: f64,
) -> CadResult<FilletResult> {
    const OPERATION: &str = "fillet_2d";

    if !radius.is_finite() || radius <= 0.0 {
        return Err(CadError::InvalidParameter {
            operation: OPERATION,
            message: format!("fillet radius must be a positive number, got {}", radius),
        });
    }

    let (Edge::Line { .. }, Edge::Line { .. }) = (first, second) else {
        return Err(CadError::Geometry {
            operation: OPERATION,
            message: "only straight edges can be filleted".into(),
        });
    };

    for point in [first.start(), first.end(), second.start(), second.end()] {
        if plane.distance_to_plane(point).abs() > tolerance {
            return Err(CadError::Geometry {
                operation: OPERATION,
                message: format!("point {:?} does not lie on the fillet plane", point),
            });
        }
    }

    // Which endpoints meet: (first ends at corner, second starts at corner)
    let candidates = [
        (first.end(), second.start(), true, true),
        (first.end(), second.end(), true, false),
        (first.start(), second.start(), false, true),
        (first.start(), second.end(), false, false),
    ];
    let Some(&(corner, _, first_ends_at_corner, second_starts_at_corner)) = candidates
        .iter()
        .find(|(a, b, _, _)| a.distance(*b) <= tolerance)
    else {
        return Err(CadError::Geometry {
            operation: OPERATION,
            message: "edges do not share an endpoint".into(),
        });
    };

    let far_first = if first_ends_at_corner {
        first.start()
    } else {
        first.end()
    };
    let far_second = if second_starts_at_corner {
        second.end()
    } else {
        second.start()
    };

    let len_first = corner.distance(far_first);
    let len_second = corner.distance(far_second);
    if len_first <= tolerance || len_second <= tolerance {
        return Err(CadError::Geometry {
            operation: OPERATION,
            message: "cannot fillet a zero-length edge".into(),
        });
    }

    let u1 = (far_first - corner) / len_first;
    let u2 = (far_second - corner) / len_second;
    let included = u1.dot(u2).clamp(-1.0, 1.0).acos();
    if included < 1e-9 || (std::f64::consts::PI - included) < 1e-9 {
        return Err(CadError::Geometry {
            operation: OPERATION,
            message: "edges are collinear".into(),
        });
    }

    let half = included * 0.5;
    let setback = radius / half.tan();
    if setback > len_first + tolerance || setback > len_second + tolerance {
        return Err(CadError::Geometry {
            operation: OPERATION,
            message: format!(
                "radius {} needs {:.4} of each edge, edges are {:.4} and {:.4} long",
                radius, setback, len_first, len_second
            ),
        });
    }

    let tangent_first = corner + u1 * setback;
    let tangent_second = corner + u2 * setback;
    let bisector = (u1 + u2).normalize();
    let center = corner + bisector * (radius / half.sin());

    let mut normal = (tangent_first - center).cross(tangent_second - center);
    if normal.length_squared() < 1e-24 {
        normal = plane.direction;
    }
    let arc = Edge::arc(center, tangent_first, tangent_second, normal);

    let trimmed_first = if first_ends_at_corner {
        Edge::line(far_first, tangent_first)
    } else {
        Edge::line(tangent_first, far_first)
    };
    let trimmed_second = if second_starts_at_corner {
        Edge::line(tangent_second, far_second)
    } else {
        Edge::line(far_second, tangent_second)
    };

    Ok(FilletResult {
        first: trimmed_first,
        arc,
        second: trimmed_second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Whether `direction` is perpendicular to the radius at `point`
    fn is_tangent(center: DVec3, point: DVec3, direction: DVec3) -> bool {
        (point - center).normalize().dot(direction.normalize()).abs() < 1e-9
    }

    fn corner_edges() -> (Edge, Edge) {
        let p1 = DVec3::new(0.0, 0.0, 0.0);
        let p2 = DVec3::new(5.0, 5.0, 0.0);
        let p3 = DVec3::new(-5.0, 5.0, 0.0);
        (Edge::line(p3, p2), Edge::line(p2, p1))
    }

    #[test]
    fn test_fillet_is_tangent_and_gap_free() {
        let (ed1, ed2) = corner_edges();
        let result = fillet_lines(&ed1, &ed2, 1.0, &Frame::world(), 1e-9).unwrap();

        let Edge::Arc { center, start, end, .. } = result.arc else {
            panic!("expected an arc");
        };
        assert_abs_diff_eq!(center.distance(start), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(center.distance(end), 1.0, epsilon = 1e-9);

        // No gaps between the trimmed edges and the arc
        assert_abs_diff_eq!(result.first.end().distance(start), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.second.start().distance(end), 0.0, epsilon = 1e-12);

        // Tangency at both joints
        assert!(is_tangent(center, start, result.first.end() - result.first.start()));
        assert!(is_tangent(center, end, result.second.end() - result.second.start()));

        // Far endpoints are untouched
        assert!(result.first.start().abs_diff_eq(ed1.start(), 1e-12));
        assert!(result.second.end().abs_diff_eq(ed2.end(), 1e-12));
    }

    #[test]
    fn test_fillet_known_values() {
        let (ed1, ed2) = corner_edges();
        let result = fillet_lines(&ed1, &ed2, 1.0, &Frame::world(), 1e-9).unwrap();
        // 45 degree corner: setback = r / tan(22.5 deg)
        let setback = 1.0 / (std::f64::consts::PI / 8.0).tan();
        assert_abs_diff_eq!(result.first.end().x, 5.0 - setback, epsilon = 1e-9);
        assert_abs_diff_eq!(result.first.end().y, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.arc.sweep_angle(), 3.0 * std::f64::consts::PI / 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_fillet_keeps_edge_directions() {
        let (ed1, ed2) = corner_edges();
        let result =
            fillet_lines(&ed1.reversed(), &ed2.reversed(), 1.0, &Frame::world(), 1e-9).unwrap();
        // first now runs corner -> far, so its trimmed start is the tangent point
        assert!(result.first.end().abs_diff_eq(ed1.start(), 1e-12));
        assert!(result.second.start().abs_diff_eq(ed2.end(), 1e-12));
        assert!(result.arc.start().abs_diff_eq(result.first.start(), 1e-12));
    }

    #[test]
    fn test_fillet_rejects_bad_input() {
        let (ed1, ed2) = corner_edges();
        let plane = Frame::world();

        let too_big = fillet_lines(&ed1, &ed2, 10.0, &plane, 1e-9);
        assert!(matches!(too_big, Err(CadError::Geometry { .. })));

        let apart = Edge::line(DVec3::new(20.0, 0.0, 0.0), DVec3::new(30.0, 0.0, 0.0));
        assert!(fillet_lines(&ed1, &apart, 1.0, &plane, 1e-9).is_err());

        let collinear = Edge::line(ed1.end(), ed1.end() + DVec3::X);
        assert!(fillet_lines(&ed1, &collinear, 1.0, &plane, 1e-9).is_err());

        let off_plane = Edge::line(ed1.end(), DVec3::new(5.0, 5.0, 3.0));
        assert!(fillet_lines(&ed1, &off_plane, 1.0, &plane, 1e-9).is_err());

        let arc = Edge::arc(DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z);
        assert!(fillet_lines(&arc, &ed2, 1.0, &plane, 1e-9).is_err());
    }

    #[test]
    fn test_fillet_rejects_non_positive_radius() {
        let (ed1, ed2) = corner_edges();
        for radius in [0.0, -1.0, f64::NAN] {
            let result = fillet_lines(&ed1, &ed2, radius, &Frame::world(), 1e-9);
            assert!(matches!(result, Err(CadError::InvalidParameter { .. })));
        }
    }
}
