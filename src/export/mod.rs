pub mod coordinator;
pub mod exporter;
pub mod glb;
pub mod mesh_id;
pub mod metadata;
pub mod staging;
pub mod summary;

pub use coordinator::{ExportCoordinator, ExportOutput};
pub use exporter::{ExportSettings, ModelExporter};
pub use glb::GlbExporter;
pub use mesh_id::{normalize_mesh_id, MeshIdAllocator};
pub use metadata::{MetadataDocument, StructureRecord};
pub use staging::{StagedMesh, StagingCollection};
pub use summary::ExportSummary;
