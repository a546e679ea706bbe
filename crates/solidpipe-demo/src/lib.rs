//! solidpipe demo application
//!
//! The demo pipelines, their configuration and the viewers that show
//! their results.

pub mod config;
pub mod demos;
pub mod viewer;

pub use config::{DemoConfig, DemoKind, ViewerBackend, ViewerConfig};
pub use demos::{DemoError, DemoResult, run, run_demo};
pub use viewer::{
    Displayed, RecordingViewer, StlViewer, Viewer, ViewerContext, ViewerError, ViewerSummary,
};
