//! CAD Kernel Abstraction Layer
//!
//! Provides a trait-based abstraction over different geometry kernels
//! (polygonal mesh, Truck, etc.) to allow switching implementations.

mod mesh;
mod traits;

#[cfg(feature = "truck")]
mod truck;

pub use mesh::MeshKernel;
pub use traits::*;

#[cfg(feature = "truck")]
pub use truck::TruckKernel;
