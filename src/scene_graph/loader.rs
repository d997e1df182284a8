//! Scene dumps: the host's object list, transforms and vertex buffers written to disk.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::Deserialize;

use crate::error::SceneLoadError;
use crate::model::MeshData;
use crate::scene_graph::collection::Collection;
use crate::scene_graph::object3d::Object3D;
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SceneDump {
    pub collections: Vec<CollectionDump>,
    pub objects: Vec<ObjectDump>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionDump {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ObjectDump {
    pub name: String,
    #[serde(rename = "type", default = "default_object_type")]
    pub object_type: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation_euler: Option<Vec3>,
    /// `[w, x, y, z]`.
    #[serde(default)]
    pub rotation_quaternion: Option<[f32; 4]>,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Row-major.
    #[serde(default)]
    pub matrix_parent_inverse: Option<[[f32; 4]; 4]>,
    /// Row-major.
    #[serde(default)]
    pub matrix_world: Option<[[f32; 4]; 4]>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default = "default_in_view_layer")]
    pub in_view_layer: bool,
    #[serde(default)]
    pub mesh: Option<MeshDump>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MeshDump {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub triangles: Vec<[u32; 3]>,
    pub material: Option<String>,
}

fn default_object_type() -> String {
    "MESH".to_string()
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_in_view_layer() -> bool {
    true
}

fn from_rows(rows: &[[f32; 4]; 4]) -> Mat4 {
    Mat4::from_cols_array_2d(rows).transpose()
}

impl ObjectDump {
    fn transform(&self) -> Transform {
        match (self.rotation_quaternion, self.rotation_euler) {
            (Some([w, x, y, z]), _) => {
                let rotation = Quat::from_xyzw(x, y, z, w).normalize();
                Transform::from_trs(self.location, rotation, self.scale)
            }
            (None, Some(euler)) => Transform::from_euler_xyz(self.location, euler, self.scale),
            (None, None) => Transform::from_trs(self.location, Quat::IDENTITY, self.scale),
        }
    }

    fn mesh(&self) -> Option<MeshData> {
        if !self.object_type.eq_ignore_ascii_case("MESH") {
            return None;
        }

        self.mesh.as_ref().map(|mesh| MeshData {
            positions: mesh.vertices.clone(),
            normals: mesh.normals.clone(),
            tex_coords: mesh.uvs.clone(),
            colors: mesh.colors.clone(),
            indices: mesh.triangles.iter().flatten().copied().collect(),
            material: mesh.material.clone(),
        })
    }
}

impl SceneDump {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse scene dump")
    }

    pub fn into_scene(self) -> Result<Scene, SceneLoadError> {
        let mut scene = Scene::new();

        let mut collection_ids = HashMap::new();
        for collection in &self.collections {
            if collection_ids.contains_key(&collection.name) {
                return Err(SceneLoadError::DuplicateCollection(collection.name.clone()));
            }

            let id = scene.add_collection(Collection::new(&collection.name));
            collection_ids.insert(collection.name.clone(), id);
        }

        for collection in &self.collections {
            if let Some(parent) = &collection.parent {
                let parent_id = *collection_ids.get(parent).ok_or_else(|| {
                    SceneLoadError::UnknownCollection {
                        owner: format!("collection {}", collection.name),
                        collection: parent.clone(),
                    }
                })?;
                scene.set_collection_parent(collection_ids[&collection.name], Some(parent_id));
            }
        }

        let mut object_ids = HashMap::new();
        for dump in &self.objects {
            if object_ids.contains_key(&dump.name) {
                return Err(SceneLoadError::DuplicateObject(dump.name.clone()));
            }

            let mut object = Object3D::new(&dump.name).with_transform(dump.transform());
            object.mesh = dump.mesh();
            if let Some(rows) = &dump.matrix_parent_inverse {
                object.parent_inverse = from_rows(rows);
            }
            object.host_world = dump.matrix_world.as_ref().map(from_rows);

            let id = scene.add_object(object);
            object_ids.insert(dump.name.clone(), id);

            if dump.in_view_layer {
                scene.link_to_view_layer(id);
            }

            for name in &dump.collections {
                let collection_id = *collection_ids.get(name).ok_or_else(|| {
                    SceneLoadError::UnknownCollection {
                        owner: format!("object {}", dump.name),
                        collection: name.clone(),
                    }
                })?;
                scene.link_object_to_collection(id, collection_id);
            }
        }

        for dump in &self.objects {
            if let Some(parent) = &dump.parent {
                let parent_id =
                    *object_ids
                        .get(parent)
                        .ok_or_else(|| SceneLoadError::UnknownParent {
                            object: dump.name.clone(),
                            parent: parent.clone(),
                        })?;
                scene.set_object_parent(object_ids[&dump.name], Some(parent_id));
            }
        }

        for dump in &self.objects {
            if scene.has_parent_cycle(object_ids[&dump.name]) {
                return Err(SceneLoadError::ParentCycle(dump.name.clone()));
            }
        }

        Ok(scene)
    }
}

/// Loads a scene from a JSON dump, or from a glTF/GLB file.
pub fn load_scene(path: &Path) -> anyhow::Result<Scene> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("gltf") | Some("glb") => {
            let (document, buffers, _images) = gltf::import(path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            let gltf_scene = document
                .default_scene()
                .or_else(|| document.scenes().next())
                .context("No scenes in gltf")?;

            let mut scene = Scene::new();
            scene.spawn_gltf_scene(&buffers, &gltf_scene)?;
            Ok(scene)
        }
        _ => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scene dump {}", path.display()))?;
            let scene = SceneDump::from_json(&json)?
                .into_scene()
                .with_context(|| format!("Invalid scene dump {}", path.display()))?;
            Ok(scene)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DUMP: &str = r#"{
        "collections": [
            { "name": "Torso" },
            { "name": "Joints", "parent": "Torso" }
        ],
        "objects": [
            {
                "name": "Pubic symphysis",
                "type": "EMPTY",
                "location": [0.0, 0.0, 0.95],
                "collections": ["Joints"]
            },
            {
                "name": "Inferior pubic ligament.l",
                "parent": "Pubic symphysis",
                "location": [0.01, -0.02, 0.0],
                "rotation_euler": [3.14159265, 0.0, 0.0],
                "scale": [-0.1, -0.1, -0.1],
                "matrix_parent_inverse": [
                    [1.0, 0.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0, 0.0],
                    [0.0, 0.0, 1.0, -0.95],
                    [0.0, 0.0, 0.0, 1.0]
                ],
                "collections": ["Joints"],
                "mesh": {
                    "vertices": [[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]],
                    "triangles": [[0, 1, 2]]
                }
            },
            {
                "name": "Hidden rib",
                "in_view_layer": false,
                "mesh": { "vertices": [[0.0, 0.0, 1.2]] }
            }
        ]
    }"#;

    #[test]
    fn dump_builds_hierarchy_collections_and_view_layer() {
        let scene = SceneDump::from_json(DUMP).unwrap().into_scene().unwrap();

        let joint = scene.get_object_by_name("Pubic symphysis").unwrap();
        let ligament = scene.get_object_by_name("Inferior pubic ligament.l").unwrap();
        let hidden = scene.get_object_by_name("Hidden rib").unwrap();

        assert!(scene.get_object(joint).unwrap().mesh.is_none());
        assert_eq!(scene.ancestors(ligament), vec![joint]);
        assert_eq!(scene.collection_names(ligament), vec!["Joints", "Torso"]);
        assert!(scene.is_in_view_layer(ligament));
        assert!(!scene.is_in_view_layer(hidden));

        let mesh = scene.get_object(ligament).unwrap().mesh.as_ref().unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn parent_inverse_is_read_row_major() {
        let scene = SceneDump::from_json(DUMP).unwrap().into_scene().unwrap();
        let ligament = scene.get_object_by_name("Inferior pubic ligament.l").unwrap();

        let origin = scene.host_world_matrix(ligament).transform_point3(Vec3::ZERO);

        assert_relative_eq!(origin.x, 0.01, epsilon = 1e-6);
        assert_relative_eq!(origin.y, -0.02, epsilon = 1e-6);
        assert_relative_eq!(origin.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn unknown_parent_and_cycles_are_rejected() {
        let dump = SceneDump::from_json(
            r#"{ "objects": [ { "name": "Rib", "parent": "Missing" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            dump.into_scene(),
            Err(SceneLoadError::UnknownParent { .. })
        ));

        let dump = SceneDump::from_json(
            r#"{ "objects": [
                { "name": "A", "parent": "B" },
                { "name": "B", "parent": "A" }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(dump.into_scene(), Err(SceneLoadError::ParentCycle(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dump = SceneDump::from_json(r#"{ "objects": [ { "name": "A" }, { "name": "A" } ] }"#)
            .unwrap();
        assert!(matches!(
            dump.into_scene(),
            Err(SceneLoadError::DuplicateObject(name)) if name == "A"
        ));

        let dump = SceneDump::from_json(
            r#"{
                "collections": [
                    { "name": "Torso" },
                    { "name": "Joints", "parent": "Torso" },
                    { "name": "Joints" }
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            dump.into_scene(),
            Err(SceneLoadError::DuplicateCollection(name)) if name == "Joints"
        ));
    }
}
