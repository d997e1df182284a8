use glam::Mat4;
use id_arena::Id;

use crate::model::MeshData;
use crate::scene_graph::collection::CollectionId;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    /// Offset captured by the host when the parent link was made.
    pub parent_inverse: Mat4,
    /// World matrix as evaluated by the host, when the dump recorded one.
    pub host_world: Option<Mat4>,
    pub mesh: Option<MeshData>,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
    pub collection_ids: Vec<CollectionId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshData) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn has_geometry(&self) -> bool {
        self.mesh.as_ref().is_some_and(MeshData::has_geometry)
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::IDENTITY,
            parent_inverse: Mat4::IDENTITY,
            host_world: None,
            mesh: None,
            parent_id: None,
            child_ids: Vec::new(),
            collection_ids: Vec::new(),
        }
    }
}
