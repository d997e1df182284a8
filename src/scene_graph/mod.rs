pub mod collection;
pub mod loader;
pub mod object3d;
pub mod scene;
pub mod transform;

// Re-export main types for convenience
pub use collection::{Collection, CollectionId};
pub use loader::{load_scene, SceneDump};
pub use object3d::{Object3D, ObjectId};
pub use scene::Scene;
pub use transform::Transform;
