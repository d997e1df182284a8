//! Exports the torso structures of an anatomical scene as a binary glTF model plus
//! a metadata sidecar, repairing world placements broken by stale parent inverses.

pub mod asset_pipeline;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod math;
pub mod model;
pub mod reconcile;
pub mod scene_graph;

pub use config::ExportConfig;
pub use error::{ExportError, ObjectError, SceneLoadError};
pub use export::{ExportCoordinator, ExportOutput, GlbExporter};
