//! Demo modelling pipelines
//!
//! Each demo is a plain function over a [`ShapeBuilder`] and a
//! [`ViewerContext`]; [`run`] wires them to a kernel built from a
//! [`DemoConfig`].

use glam::{DVec2, DVec3};
use solidpipe_cad::{
    Axis3D, BooleanType, CadError, ConfigError, Edge, Frame, Primitive, Profile, ShapeBuilder,
    Solid, Transform, Wire, kernel_with_config,
};
use tracing::info;

use crate::config::{DemoConfig, DemoKind};
use crate::viewer::{ViewerContext, ViewerError, ViewerSummary};

/// Demo errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DemoError {
    #[error("CAD error: {0}")]
    Cad(#[from] CadError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Viewer error: {0}")]
    Viewer(#[from] ViewerError),
}

pub type DemoResult<T> = Result<T, DemoError>;

/// Sphere radius of the mixed boolean part
const SPHERE_RADIUS: f64 = 1.0;
/// Diameter of the central hole
const HOLE_DIAMETER: f64 = 0.8;
/// Number of notches cut around the rim
const NOTCH_COUNT: usize = 8;
/// Inner radius of the groove profile
const GROOVE_INNER_RADIUS: f64 = 0.6;

/// Sphere cut flat at latitudes ±atan(0.5)
fn sphere_zone(builder: &ShapeBuilder<'_>) -> DemoResult<Solid> {
    let angle = 0.5_f64.atan();
    Ok(builder.make_primitive(
        &Frame::world(),
        &Primitive::sphere_zone(SPHERE_RADIUS, -angle, angle),
    )?)
}

/// Cylinder r=0.25, h=2 centred on z=0 at the rim
fn notch_tool(builder: &ShapeBuilder<'_>) -> DemoResult<Solid> {
    let height = 2.0;
    let frame = Frame::at(DVec3::new(SPHERE_RADIUS, 0.0, -height / 2.0));
    Ok(builder.make_primitive(&frame, &Primitive::cylinder(0.25, height))?)
}

/// Six-sided groove section in the XZ plane, closed
pub fn groove_profile() -> Profile {
    let r = GROOVE_INNER_RADIUS;
    Profile::new(vec![
        DVec3::new(r - 0.05, 0.0, -0.05),
        DVec3::new(r - 0.10, 0.0, -0.025),
        DVec3::new(r - 0.10, 0.0, 0.025),
        DVec3::new(r + 0.10, 0.0, 0.025),
        DVec3::new(r + 0.10, 0.0, -0.025),
        DVec3::new(r + 0.05, 0.0, -0.05),
        DVec3::new(r - 0.05, 0.0, -0.05),
    ])
}

/// Drop handles that later steps no longer read
fn release(builder: &ShapeBuilder<'_>, solids: &[&Solid]) {
    for solid in solids {
        builder.kernel().release(solid);
    }
}

/// Ring groove cut into the top face
fn revolved_cut(builder: &ShapeBuilder<'_>, base: &Solid) -> DemoResult<Solid> {
    let ring = builder.revolve_profile(&groove_profile(), &Axis3D::z())?;
    let lift = Transform::translation_between(DVec3::ZERO, DVec3::new(0.0, 0.0, 0.5_f64.sin()));
    let moved = builder.apply_transform(&ring, &lift, false)?;
    let grooved = builder.boolean_combine(base, &moved, BooleanType::Cut)?;
    release(builder, &[&moved, &ring]);
    Ok(grooved)
}

/// Drilled, notched and grooved sphere zone fused with a torus
///
/// Only the returned solid stays stored in the kernel.
pub fn mixed_boolean(builder: &ShapeBuilder<'_>, viewer: &mut ViewerContext) -> DemoResult<Solid> {
    let zone = sphere_zone(builder)?;
    let drilled = builder.drill_hole(&zone, &Axis3D::z(), HOLE_DIAMETER)?;
    release(builder, &[&zone]);

    let tool = notch_tool(builder)?;
    let notched = builder.repeated_radial_pattern(&drilled, &tool, NOTCH_COUNT, BooleanType::Cut)?;
    release(builder, &[&drilled, &tool]);

    let ring_radius = 0.25;
    let torus = builder.make_primitive(
        &Frame::world(),
        &Primitive::torus(SPHERE_RADIUS - ring_radius, ring_radius),
    )?;
    let fused = builder.boolean_combine(&notched, &torus, BooleanType::Fuse)?;
    release(builder, &[&notched, &torus]);

    let result = revolved_cut(builder, &fused)?;
    release(builder, &[&fused]);
    info!("Mixed boolean demo finished: {}", result);
    viewer.show_solid(builder, "mixed_boolean", &result, true);
    Ok(result)
}

/// Two lines meeting at (5, 5) joined by a radius 1 arc
pub fn fillet_2d(builder: &ShapeBuilder<'_>, viewer: &mut ViewerContext) -> DemoResult<Wire> {
    let p1 = DVec3::new(0.0, 0.0, 0.0);
    let p2 = DVec3::new(5.0, 5.0, 0.0);
    let p3 = DVec3::new(-5.0, 5.0, 0.0);
    let ed1 = Edge::line(p3, p2);
    let ed2 = Edge::line(p2, p1);

    let fillet = builder.fillet_corner(&ed1, &ed2, 1.0, &Frame::world())?;
    let wire = builder.make_wire(fillet.edges())?;
    info!("Fillet demo finished: wire of length {:.4}", wire.length());
    viewer.show_wire("fillet_2d", &wire, true);
    Ok(wire)
}

/// Quadrilateral on the XY plane revolved about the Y axis
pub fn revolve(builder: &ShapeBuilder<'_>, viewer: &mut ViewerContext) -> DemoResult<Solid> {
    let corners = [
        DVec2::new(40.0, 0.0),
        DVec2::new(82.5, 25.0),
        DVec2::new(42.5, 93.0),
        DVec2::new(0.0, 68.0),
    ];
    let edges = (0..corners.len())
        .map(|i| {
            let a = corners[i];
            let b = corners[(i + 1) % corners.len()];
            Edge::line(a.extend(0.0), b.extend(0.0))
        })
        .collect();
    let wire = builder.make_wire(edges)?;

    // Straight edges sample to their corners
    let profile = wire.to_profile(1);
    let solid = builder.revolve_profile(&profile, &Axis3D::y())?;
    info!("Revolve demo finished: {}", solid);

    viewer.show_wire("revolve_profile", &wire, true);
    viewer.show_solid(builder, "revolve", &solid, true);
    Ok(solid)
}

/// Run one demo
pub fn run_demo(
    kind: DemoKind,
    builder: &ShapeBuilder<'_>,
    viewer: &mut ViewerContext,
) -> DemoResult<()> {
    info!("Running demo {}", kind);
    match kind {
        DemoKind::MixedBoolean => mixed_boolean(builder, viewer).map(|_| ()),
        DemoKind::Fillet2d => fillet_2d(builder, viewer).map(|_| ()),
        DemoKind::Revolve => revolve(builder, viewer).map(|_| ()),
    }
}

/// Run the configured demos against a fresh kernel
///
/// The viewer is torn down even when a demo fails.
pub fn run(config: &DemoConfig) -> DemoResult<ViewerSummary> {
    config.validate()?;
    let kernel = kernel_with_config(config.kernel.clone());
    info!("Using {} kernel", kernel.name());
    let builder = ShapeBuilder::new(kernel.as_ref()).with_tolerance(config.kernel.tolerance);

    let mut viewer = ViewerContext::init(&config.viewer)?;
    let outcome = config
        .demos
        .iter()
        .try_for_each(|kind| run_demo(*kind, &builder, &mut viewer));
    let summary = viewer.teardown();
    outcome.map(|()| summary)
}
