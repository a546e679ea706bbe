//! Faceted revolution of planar profiles

use glam::{DQuat, DVec2, DVec3};

use super::polygon::Polygon;
use super::shape::signed_volume;
use crate::config::KernelConfig;
use crate::geometry::Axis3D;
use crate::kernel::{CadError, CadResult};
use crate::sketch::Profile;

const OPERATION: &str = "revolve";

/// Angular tolerance for the profile plane containing the axis
const ANGULAR_TOLERANCE: f64 = 1e-6;

/// A profile checked to be revolvable around an axis
pub(crate) struct RevolveFrame {
    /// Loop vertices without the closing duplicate
    pub points: Vec<DVec3>,
    /// In-plane direction perpendicular to the axis, pointing at the profile
    pub radial: DVec3,
}

/// Reject angles outside (0, 2π]
pub(crate) fn check_angle(angle: f64) -> CadResult<()> {
    if !angle.is_finite() || angle <= 0.0 || angle > std::f64::consts::TAU + 1e-9 {
        return Err(CadError::invalid(
            OPERATION,
            format!("angle must lie in (0, 2pi], got {}", angle),
        ));
    }
    Ok(())
}

/// Whether `angle` is a whole turn
pub(crate) fn is_full_turn(angle: f64) -> bool {
    angle >= std::f64::consts::TAU - 1e-9
}

/// Check a profile against an axis and return its loop
pub(crate) fn prepare(profile: &Profile, axis: &Axis3D, tolerance: f64) -> CadResult<RevolveFrame> {
    if !axis.is_valid() {
        return Err(CadError::invalid(
            OPERATION,
            format!("axis direction {:?} is degenerate", axis.direction),
        ));
    }

    let gap = profile.closure_gap();
    if gap > tolerance {
        return Err(CadError::OpenProfile {
            profile: profile.id,
            gap,
        });
    }

    let points = profile.distinct_points(tolerance);
    if points.len() < 3 {
        return Err(CadError::geometry(
            OPERATION,
            format!("profile {} has fewer than 3 distinct points", profile.id),
        ));
    }

    let Some(normal) = profile.normal() else {
        return Err(CadError::geometry(
            OPERATION,
            format!("profile {} encloses no area", profile.id),
        ));
    };
    if !profile.is_planar(tolerance) {
        return Err(CadError::geometry(
            OPERATION,
            format!("profile {} is not planar", profile.id),
        ));
    }
    if normal.dot(axis.direction).abs() > ANGULAR_TOLERANCE
        || (axis.origin - points[0]).dot(normal).abs() > tolerance
    {
        return Err(CadError::geometry(
            OPERATION,
            format!("axis does not lie in the plane of profile {}", profile.id),
        ));
    }

    let mut radial = normal.cross(axis.direction).normalize();
    let offsets: Vec<f64> = points
        .iter()
        .map(|p| (*p - axis.origin).dot(radial))
        .collect();
    let positive = offsets.iter().any(|s| *s > tolerance);
    let negative = offsets.iter().any(|s| *s < -tolerance);
    if positive && negative {
        return Err(CadError::geometry(
            OPERATION,
            format!("profile {} crosses the revolution axis", profile.id),
        ));
    }
    if negative {
        radial = -radial;
    }

    Ok(RevolveFrame { points, radial })
}

/// Revolve `profile` by `angle` around `axis` into outward-facing facets
pub(crate) fn revolve(
    profile: &Profile,
    axis: &Axis3D,
    angle: f64,
    config: &KernelConfig,
) -> CadResult<Vec<Polygon>> {
    check_angle(angle)?;
    let frame = prepare(profile, axis, config.tolerance)?;
    let full = is_full_turn(angle);
    let steps = config.segments_for(angle, if full { 3 } else { 1 }) as usize;
    let n = frame.points.len();

    let mut rings: Vec<Vec<DVec3>> = (0..steps)
        .map(|k| {
            let rotation = DQuat::from_axis_angle(axis.direction, angle * k as f64 / steps as f64);
            frame
                .points
                .iter()
                .map(|p| axis.origin + rotation * (*p - axis.origin))
                .collect()
        })
        .collect();
    if full {
        rings.push(rings[0].clone());
    } else {
        let rotation = DQuat::from_axis_angle(axis.direction, angle);
        rings.push(
            frame
                .points
                .iter()
                .map(|p| axis.origin + rotation * (*p - axis.origin))
                .collect(),
        );
    }

    let mut polygons = Vec::with_capacity(steps * n + 2);
    for k in 0..steps {
        let (current, next) = (&rings[k], &rings[k + 1]);
        for i in 0..n {
            let j = (i + 1) % n;
            if let Some(quad) = Polygon::new(vec![current[i], current[j], next[j], next[i]]) {
                polygons.push(quad);
            }
        }
    }

    if !full {
        let triangles = triangulate(&frame, axis)?;
        let (start, end) = (&rings[0], &rings[steps]);
        for [a, b, c] in &triangles {
            if let Some(cap) = Polygon::new(vec![start[*c], start[*b], start[*a]]) {
                polygons.push(cap);
            }
            if let Some(cap) = Polygon::new(vec![end[*a], end[*b], end[*c]]) {
                polygons.push(cap);
            }
        }
    }

    let volume = signed_volume(&polygons);
    let scale = frame
        .points
        .iter()
        .map(|p| axis.distance_to(*p))
        .fold(0.0_f64, f64::max);
    if volume.abs() <= config.tolerance * scale * scale {
        return Err(CadError::geometry(
            OPERATION,
            format!("revolving profile {} encloses no volume", profile.id),
        ));
    }
    if volume < 0.0 {
        for polygon in &mut polygons {
            polygon.flip();
        }
    }
    Ok(polygons)
}

/// Ear-clip the profile loop in its own plane, keeping the loop's winding
fn triangulate(frame: &RevolveFrame, axis: &Axis3D) -> CadResult<Vec<[usize; 3]>> {
    let flat: Vec<DVec2> = frame
        .points
        .iter()
        .map(|p| {
            let d = *p - axis.origin;
            DVec2::new(d.dot(frame.radial), d.dot(axis.direction))
        })
        .collect();

    let n = flat.len();
    let area: f64 = (0..n).map(|i| flat[i].perp_dot(flat[(i + 1) % n])).sum();
    let ccw = area > 0.0;
    let mut ring: Vec<usize> = (0..n).collect();
    if !ccw {
        ring.reverse();
    }

    let mut triangles = Vec::with_capacity(n.saturating_sub(2));
    while ring.len() > 3 {
        let m = ring.len();
        let ear = (0..m).find(|&i| {
            let (a, b, c) = (ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]);
            let (pa, pb, pc) = (flat[a], flat[b], flat[c]);
            if (pb - pa).perp_dot(pc - pb) <= 1e-14 {
                return false;
            }
            ring.iter()
                .filter(|&&v| v != a && v != b && v != c)
                .all(|&v| !point_in_triangle(flat[v], pa, pb, pc))
        });
        let Some(i) = ear else {
            return Err(CadError::geometry(
                OPERATION,
                "cannot triangulate the profile for the end caps",
            ));
        };
        triangles.push([ring[(i + m - 1) % m], ring[i], ring[(i + 1) % m]]);
        ring.remove(i);
    }
    triangles.push([ring[0], ring[1], ring[2]]);

    if !ccw {
        for triangle in &mut triangles {
            triangle.swap(1, 2);
        }
    }
    Ok(triangles)
}

fn point_in_triangle(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> bool {
    let d1 = (b - a).perp_dot(p - a);
    let d2 = (c - b).perp_dot(p - b);
    let d3 = (a - c).perp_dot(p - c);
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}
