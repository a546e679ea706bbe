//! Solid modelling pipeline over a pluggable CAD kernel
//!
//! This crate provides:
//! - The [`CadKernel`] trait and its backends (polygonal mesh, optional Truck)
//! - [`ShapeBuilder`], which sequences kernel calls into modelling steps
//! - Sketch values: profiles, edges, wires and 2D fillets
//! - Kernel configuration stored as RON

pub mod builder;
pub mod config;
pub mod geometry;
pub mod kernel;
pub mod sketch;

pub use builder::ShapeBuilder;
pub use config::{ConfigError, KernelConfig};
pub use geometry::{Aabb, Axis3D, Frame, Transform};
pub use kernel::{
    BooleanType, CadError, CadKernel, CadResult, MassProperties, MeshKernel, NullKernel,
    Primitive, Solid, TessellatedMesh, default_kernel, kernel_with_config,
};
#[cfg(feature = "truck")]
pub use kernel::TruckKernel;
pub use sketch::{Edge, FilletResult, Profile, Wire};
