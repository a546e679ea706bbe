//! End-to-end modelling pipelines against the mesh kernel

use std::f64::consts::PI;

use approx::assert_relative_eq;
use glam::DVec3;
use solidpipe_cad::{
    Axis3D, BooleanType, CadError, CadKernel, Edge, Frame, KernelConfig, MeshKernel, Primitive,
    Profile, ShapeBuilder, Transform,
};

fn kernel() -> MeshKernel {
    MeshKernel::with_config(KernelConfig::default().with_circle_segments(48))
}

/// Sphere zone between latitudes ±atan(0.5)
fn zone(builder: &ShapeBuilder<'_>) -> solidpipe_cad::Solid {
    let phi = 0.5_f64.atan();
    builder
        .make_primitive(&Frame::world(), &Primitive::sphere_zone(1.0, -phi, phi))
        .unwrap()
}

/// Cylinder r=0.25, h=2 standing on z=-1 at radius 1 on the X axis
fn notch_tool(builder: &ShapeBuilder<'_>) -> solidpipe_cad::Solid {
    builder
        .make_primitive(
            &Frame::at(DVec3::new(1.0, 0.0, -1.0)),
            &Primitive::cylinder(0.25, 2.0),
        )
        .unwrap()
}

#[test]
fn test_cylinder_volume() {
    let kernel = MeshKernel::new();
    let builder = ShapeBuilder::new(&kernel);
    let cylinder = builder
        .make_primitive(&Frame::world(), &Primitive::cylinder(0.5, 3.0))
        .unwrap();
    let props = builder.measure(&cylinder).unwrap();
    assert_relative_eq!(props.volume, PI * 0.25 * 3.0, max_relative = 1e-2);
    assert_relative_eq!(props.centroid.z, 1.5, epsilon = 1e-9);
}

#[test]
fn test_radial_notches_on_sphere_zone() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let tool = notch_tool(&builder);

    let notched = builder
        .repeated_radial_pattern(&base, &tool, 8, BooleanType::Cut)
        .unwrap();

    let before = builder.measure(&base).unwrap();
    let after = builder.measure(&notched).unwrap();
    let h = 0.5_f64.atan().sin();
    let exact = PI * (2.0 * h - 2.0 * h.powi(3) / 3.0);
    assert_relative_eq!(before.volume, exact, max_relative = 2e-2);

    // Disjoint notches each remove what a single one does
    let single = builder
        .repeated_radial_pattern(&base, &tool, 1, BooleanType::Cut)
        .unwrap();
    let one_notch = before.volume - builder.measure(&single).unwrap().volume;
    assert!(one_notch > 0.05 && one_notch < 0.09, "one notch {}", one_notch);
    assert_relative_eq!(before.volume - after.volume, 8.0 * one_notch, max_relative = 1e-3);
    assert!(after.face_count > before.face_count);
    assert!(!builder.tessellate(&notched, 0.01).unwrap().is_empty());
}

#[test]
fn test_radial_pattern_is_deterministic() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let tool = notch_tool(&builder);

    let first = builder
        .repeated_radial_pattern(&base, &tool, 8, BooleanType::Cut)
        .unwrap();
    let second = builder
        .repeated_radial_pattern(&base, &tool, 8, BooleanType::Cut)
        .unwrap();
    assert_ne!(first, second);

    let a = builder.measure(&first).unwrap();
    let b = builder.measure(&second).unwrap();
    assert_eq!(a.volume, b.volume);
    assert_eq!(a.face_count, b.face_count);
}

#[test]
fn test_radial_pattern_keeps_inputs() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let tool = notch_tool(&builder);
    let tool_volume = builder.measure(&tool).unwrap().volume;

    builder
        .repeated_radial_pattern(&base, &tool, 8, BooleanType::Cut)
        .unwrap();
    assert_relative_eq!(builder.measure(&tool).unwrap().volume, tool_volume);
    assert!(builder.measure(&base).is_ok());

    let err = builder
        .repeated_radial_pattern(&base, &tool, 0, BooleanType::Cut)
        .unwrap_err();
    assert!(matches!(err, CadError::InvalidParameter { .. }));
}

#[test]
fn test_single_copy_pattern_equals_boolean() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let tool = notch_tool(&builder);

    let pattern = builder
        .repeated_radial_pattern(&base, &tool, 1, BooleanType::Cut)
        .unwrap();
    let direct = builder.boolean_combine(&base, &tool, BooleanType::Cut).unwrap();
    assert_relative_eq!(
        builder.measure(&pattern).unwrap().volume,
        builder.measure(&direct).unwrap().volume,
        max_relative = 1e-9
    );
}

#[test]
fn test_revolve_open_profile_fails() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let open = Profile::new(vec![
        DVec3::new(0.5, 0.0, 0.0),
        DVec3::new(0.7, 0.0, 0.0),
        DVec3::new(0.7, 0.0, 0.2),
        DVec3::new(0.5, 0.0, 0.2),
    ]);
    let result = builder.revolve_profile(&open, &Axis3D::z());
    assert!(matches!(result, Err(CadError::OpenProfile { profile, .. }) if profile == open.id));
}

#[test]
fn test_groove_profile_revolves() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let groove = Profile::new(vec![
        DVec3::new(0.55, 0.0, -0.05),
        DVec3::new(0.5, 0.0, -0.025),
        DVec3::new(0.5, 0.0, 0.025),
        DVec3::new(0.7, 0.0, 0.025),
        DVec3::new(0.7, 0.0, -0.025),
        DVec3::new(0.65, 0.0, -0.05),
        DVec3::new(0.55, 0.0, -0.05),
    ]);
    let ring = builder.revolve_profile(&groove, &Axis3D::z()).unwrap();
    let props = builder.measure(&ring).unwrap();
    assert!(props.volume > 0.0);
    assert_relative_eq!(props.bounds.max.z, 0.025, epsilon = 1e-9);
    assert_relative_eq!(props.bounds.min.z, -0.05, epsilon = 1e-9);
}

#[test]
fn test_fillet_corner_scenario() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let p1 = DVec3::new(0.0, 0.0, 0.0);
    let p2 = DVec3::new(5.0, 5.0, 0.0);
    let p3 = DVec3::new(-5.0, 5.0, 0.0);
    let ed1 = Edge::line(p3, p2);
    let ed2 = Edge::line(p2, p1);

    let fillet = builder
        .fillet_corner(&ed1, &ed2, 1.0, &Frame::world())
        .unwrap();
    assert_eq!(fillet.arc.radius(), Some(1.0));
    assert!(fillet.first.end().abs_diff_eq(fillet.arc.start(), 1e-12));
    assert!(fillet.arc.end().abs_diff_eq(fillet.second.start(), 1e-12));

    let wire = builder.make_wire(fillet.edges()).unwrap();
    assert!(!wire.is_closed(1e-9));
    assert!(wire.length() < ed1.length() + ed2.length());
}

#[test]
fn test_shallow_and_deep_transform() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let lift = Transform::translation(DVec3::new(0.0, 0.0, 0.5_f64.sin()));

    let shallow = builder.apply_transform(&base, &lift, false).unwrap();
    let deep = builder.apply_transform(&base, &lift, true).unwrap();
    assert!(kernel.shares_topology(&base, &shallow));
    assert!(!kernel.shares_topology(&base, &deep));

    let a = builder.measure(&shallow).unwrap();
    let b = builder.measure(&deep).unwrap();
    assert_relative_eq!(a.volume, b.volume, max_relative = 1e-12);
    assert!(a.centroid.abs_diff_eq(b.centroid, 1e-12));
    assert_relative_eq!(a.centroid.z, 0.5_f64.sin(), epsilon = 1e-9);
}

#[test]
fn test_errors_carry_context() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let a = builder
        .make_primitive(&Frame::world(), &Primitive::sphere(0.5))
        .unwrap();
    let b = builder
        .make_primitive(&Frame::at(DVec3::new(3.0, 0.0, 0.0)), &Primitive::sphere(0.5))
        .unwrap();

    let err = builder
        .boolean_combine(&a, &b, BooleanType::Common)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("common"));
    assert!(message.contains(&a.id.to_string()));
    assert!(message.contains(&b.id.to_string()));

    assert!(kernel.release(&b));
    let err = builder.boolean_combine(&a, &b, BooleanType::Fuse).unwrap_err();
    assert!(matches!(err, CadError::SolidNotFound { id, .. } if id == b.id));

    let miss = builder
        .drill_hole(&a, &Axis3D::new(DVec3::new(2.0, 0.0, 0.0), DVec3::Z), 0.2)
        .unwrap_err();
    assert_eq!(miss.operation(), Some("drill_hole"));
}

/// Cutting a tool away and fusing it back is not an identity: the part of
/// the tool outside the base is added
#[test]
fn test_cut_then_fuse_does_not_restore() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = builder
        .make_primitive(&Frame::at(DVec3::new(0.0, 0.0, -1.0)), &Primitive::cylinder(1.0, 2.0))
        .unwrap();
    let tool = builder
        .make_primitive(&Frame::at(DVec3::new(1.0, 0.0, 0.0)), &Primitive::sphere(0.5))
        .unwrap();

    let cut = builder.boolean_combine(&base, &tool, BooleanType::Cut).unwrap();
    let restored = builder.boolean_combine(&cut, &tool, BooleanType::Fuse).unwrap();

    let original = builder.measure(&base).unwrap().volume;
    let result = builder.measure(&restored).unwrap().volume;
    assert!(result > original + 0.1, "{} vs {}", result, original);
}

#[test]
fn test_mixed_boolean_pipeline() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);
    let base = zone(&builder);
    let drilled = builder.drill_hole(&base, &Axis3D::z(), 0.8).unwrap();
    let tool = notch_tool(&builder);
    let notched = builder
        .repeated_radial_pattern(&drilled, &tool, 8, BooleanType::Cut)
        .unwrap();
    let torus = builder
        .make_primitive(&Frame::world(), &Primitive::torus(0.75, 0.25))
        .unwrap();
    let fused = builder
        .boolean_combine(&notched, &torus, BooleanType::Fuse)
        .unwrap();

    let drilled_volume = builder.measure(&drilled).unwrap().volume;
    let base_volume = builder.measure(&base).unwrap().volume;
    assert!(base_volume - drilled_volume > 0.4);
    assert!(builder.measure(&fused).unwrap().volume > builder.measure(&notched).unwrap().volume);
}

#[test]
fn test_parallel_branches_share_kernel() {
    let kernel = kernel();
    let builder = ShapeBuilder::new(&kernel);

    let (left, right) = std::thread::scope(|scope| {
        let left = scope.spawn(|| {
            let base = zone(&builder);
            builder.drill_hole(&base, &Axis3D::z(), 0.4)
        });
        let right = scope.spawn(|| {
            // Tube reaches past the zone's rim
            builder.make_primitive(&Frame::world(), &Primitive::torus(1.0, 0.2))
        });
        (left.join(), right.join())
    });
    let left = left.unwrap().unwrap();
    let right = right.unwrap().unwrap();

    let fused = builder.boolean_combine(&left, &right, BooleanType::Fuse).unwrap();
    let fused = builder.measure(&fused).unwrap().volume;
    let left = builder.measure(&left).unwrap().volume;
    let right = builder.measure(&right).unwrap().volume;
    assert!(fused > left, "fused {} vs drilled zone {}", fused, left);
    assert!(fused > right, "fused {} vs torus {}", fused, right);
    assert!(fused < left + right);
}

#[test]
fn test_default_kernel_builds_cylinder() {
    let kernel = solidpipe_cad::default_kernel();
    assert!(kernel.is_available());
    let builder = ShapeBuilder::new(kernel.as_ref());
    let cylinder = builder
        .make_primitive(&Frame::world(), &Primitive::cylinder(1.0, 1.0))
        .unwrap();
    assert_relative_eq!(builder.measure(&cylinder).unwrap().volume, PI, max_relative = 2e-2);
}
