//! Primitive solids as revolved profiles
//!
//! Every primitive is built in local coordinates: the profile lies in the
//! XZ half-plane `x >= 0` and is revolved a full turn around the local Z axis.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::DVec3;

use super::polygon::Polygon;
use super::sweep;
use crate::config::KernelConfig;
use crate::geometry::Axis3D;
use crate::kernel::{CadResult, Primitive};
use crate::sketch::Profile;

/// Closed meridian profile of a primitive
pub(crate) fn meridian(primitive: &Primitive, config: &KernelConfig) -> Profile {
    match *primitive {
        Primitive::Sphere {
            radius,
            min_latitude,
            max_latitude,
        } => {
            let low = min_latitude.clamp(-FRAC_PI_2, FRAC_PI_2);
            let high = max_latitude.clamp(-FRAC_PI_2, FRAC_PI_2);
            let rings = config.segments_for(high - low, 1);
            let mut points = Vec::with_capacity(rings as usize + 3);
            points.push(DVec3::new(0.0, 0.0, radius * low.sin()));
            for i in 0..=rings {
                let phi = low + (high - low) * i as f64 / rings as f64;
                points.push(DVec3::new(radius * phi.cos(), 0.0, radius * phi.sin()));
            }
            points.push(DVec3::new(0.0, 0.0, radius * high.sin()));
            Profile::polygon(points)
        }
        Primitive::Cylinder { radius, height } => Profile::polygon(vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(radius, 0.0, 0.0),
            DVec3::new(radius, 0.0, height),
            DVec3::new(0.0, 0.0, height),
        ]),
        Primitive::Torus {
            major_radius,
            minor_radius,
        } => {
            let segments = config.segments_for(TAU, 3);
            Profile::polygon(
                (0..segments)
                    .map(|i| {
                        let t = TAU * i as f64 / segments as f64;
                        DVec3::new(
                            major_radius + minor_radius * t.cos(),
                            0.0,
                            minor_radius * t.sin(),
                        )
                    })
                    .collect(),
            )
        }
    }
}

/// Facets of a primitive in its local coordinates
pub(crate) fn build(primitive: &Primitive, config: &KernelConfig) -> CadResult<Vec<Polygon>> {
    primitive.validate()?;
    let profile = meridian(primitive, config);
    sweep::revolve(&profile, &Axis3D::z(), TAU, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::mesh::shape::signed_volume;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn fine() -> KernelConfig {
        KernelConfig::default().with_circle_segments(128)
    }

    #[test]
    fn test_full_sphere_volume() {
        let polygons = build(&Primitive::sphere(1.0), &fine()).unwrap();
        assert_relative_eq!(signed_volume(&polygons), 4.0 / 3.0 * PI, max_relative = 2e-3);
    }

    #[test]
    fn test_sphere_zone_volume() {
        let phi = 0.5_f64.atan();
        let polygons = build(&Primitive::sphere_zone(1.0, -phi, phi), &fine()).unwrap();
        let h = phi.sin();
        let exact = PI * (2.0 * h - 2.0 * h.powi(3) / 3.0);
        assert_relative_eq!(signed_volume(&polygons), exact, max_relative = 2e-3);
    }

    #[test]
    fn test_latitudes_beyond_pole_are_clamped() {
        let clamped = build(&Primitive::sphere_zone(1.0, -PI, PI), &fine()).unwrap();
        let full = build(&Primitive::sphere(1.0), &fine()).unwrap();
        assert_relative_eq!(signed_volume(&clamped), signed_volume(&full), max_relative = 1e-9);
    }

    #[test]
    fn test_cylinder_volume() {
        let polygons = build(&Primitive::cylinder(0.25, 2.0), &fine()).unwrap();
        assert_relative_eq!(signed_volume(&polygons), PI * 0.0625 * 2.0, max_relative = 1e-3);
    }

    #[test]
    fn test_torus_volume() {
        let polygons = build(&Primitive::torus(0.75, 0.25), &fine()).unwrap();
        let exact = 2.0 * PI * PI * 0.75 * 0.0625;
        assert_relative_eq!(signed_volume(&polygons), exact, max_relative = 2e-3);
    }

    #[test]
    fn test_invalid_primitive_is_rejected() {
        assert!(build(&Primitive::torus(0.25, 0.75), &fine()).is_err());
        assert!(build(&Primitive::cylinder(-1.0, 1.0), &fine()).is_err());
    }
}
