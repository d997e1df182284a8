use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;
use serde::Deserialize;
use std::collections::HashSet;

use crate::model::{Buffers, MeshData};
use crate::scene_graph::collection::{Collection, CollectionId};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub collections: Arena<Collection>,
    view_layer: HashSet<ObjectId>,
}

/// Extra per-node data a host may attach to glTF nodes.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NodeExtras {
    collections: Vec<String>,
    in_view_layer: Option<bool>,
    /// Column-major.
    matrix_world: Option<[f32; 16]>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            collections: Arena::new(),
            view_layer: HashSet::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Ids of every object in insertion order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|(id, _)| id).collect()
    }

    pub fn add_collection(&mut self, collection: Collection) -> CollectionId {
        self.collections.alloc(collection)
    }

    pub fn get_collection_by_name(&self, name: &str) -> Option<CollectionId> {
        self.collections
            .iter()
            .find(|(_, collection)| collection.name == name)
            .map(|(id, _)| id)
    }

    pub fn ensure_collection(&mut self, name: &str) -> CollectionId {
        match self.get_collection_by_name(name) {
            Some(id) => id,
            None => self.add_collection(Collection::new(name)),
        }
    }

    pub fn set_collection_parent(&mut self, child: CollectionId, parent: Option<CollectionId>) {
        if let Some(collection) = self.collections.get_mut(child) {
            collection.parent_id = parent;
        }
    }

    pub fn link_object_to_collection(&mut self, object_id: ObjectId, collection_id: CollectionId) {
        if let Some(object) = self.objects.get_mut(object_id) {
            if !object.collection_ids.contains(&collection_id) {
                object.collection_ids.push(collection_id);
            }
        }
    }

    pub fn link_to_view_layer(&mut self, object_id: ObjectId) {
        self.view_layer.insert(object_id);
    }

    pub fn is_in_view_layer(&self, object_id: ObjectId) -> bool {
        self.view_layer.contains(&object_id)
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        // Remove from old parent's children list
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        // Set new parent and add to new parent's children list
        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }
    }

    /// Ancestors of an object ordered from the root down to the direct parent.
    ///
    /// Stops early if the parent links loop back on themselves.
    pub fn ancestors(&self, object_id: ObjectId) -> Vec<ObjectId> {
        let mut ancestors = Vec::new();
        let mut current = self.objects.get(object_id).and_then(|o| o.parent_id);

        while let Some(id) = current {
            if id == object_id || ancestors.contains(&id) {
                log::warn!("Parent cycle detected above object {:?}", object_id);
                break;
            }

            ancestors.push(id);
            current = self.objects.get(id).and_then(|o| o.parent_id);
        }

        ancestors.reverse();
        ancestors
    }

    pub fn has_parent_cycle(&self, object_id: ObjectId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(object_id);

        while let Some(id) = current {
            if !visited.insert(id) {
                return true;
            }
            current = self.objects.get(id).and_then(|o| o.parent_id);
        }

        false
    }

    /// World matrix the way the host evaluates it: `parent_world * parent_inverse * local`,
    /// unless the host recorded its own evaluation for an object on the chain.
    pub fn host_world_matrix(&self, object_id: ObjectId) -> Mat4 {
        let mut world = Mat4::IDENTITY;
        let ancestors = self.ancestors(object_id);

        for (depth, id) in ancestors.iter().chain(std::iter::once(&object_id)).enumerate() {
            let Some(object) = self.objects.get(*id) else {
                continue;
            };

            world = match object.host_world {
                Some(host_world) => host_world,
                None if depth == 0 => object.transform.local_matrix(),
                None => world * object.parent_inverse * object.transform.local_matrix(),
            };
        }

        world
    }

    /// Names of the collections an object is linked to, followed by their parent
    /// collections, without duplicates.
    pub fn collection_names(&self, object_id: ObjectId) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let Some(object) = self.objects.get(object_id) else {
            return names;
        };

        for &collection_id in &object.collection_ids {
            let mut current = Some(collection_id);
            let mut steps = 0;

            while let Some(id) = current {
                let Some(collection) = self.collections.get(id) else {
                    break;
                };

                if !names.contains(&collection.name.as_str()) {
                    names.push(&collection.name);
                }

                steps += 1;
                if steps > self.collections.len() {
                    break;
                }
                current = collection.parent_id;
            }
        }

        names
    }

    pub fn spawn_gltf_scene(
        &mut self,
        buffers: Buffers,
        scene: &gltf::Scene,
    ) -> anyhow::Result<Vec<ObjectId>> {
        let mut root_ids = Vec::new();

        for node in scene.nodes() {
            root_ids.push(self.spawn_gltf_node(buffers, &node, None)?);
        }

        Ok(root_ids)
    }

    fn spawn_gltf_node(
        &mut self,
        buffers: Buffers,
        node: &gltf::Node,
        parent: Option<ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        let (translation, rotation, scale) = node.transform().decomposed();

        let mut object = Object3D::new(node_name.clone()).with_transform(Transform::from_trs(
            translation.into(),
            Quat::from_array(rotation),
            Vec3::from(scale),
        ));

        if let Some(mesh) = node.mesh() {
            object = object.with_mesh(MeshData::from_gltf(mesh, buffers)?);
        }

        let extras = match node.extras() {
            Some(raw) => serde_json::from_str::<NodeExtras>(raw.get()).map_err(|e| {
                anyhow::anyhow!("Invalid extras on glTF node {}: {}", node_name, e)
            })?,
            None => NodeExtras::default(),
        };

        object.host_world = extras.matrix_world.map(|m| Mat4::from_cols_array(&m));

        let object_id = self.add_object(object);

        if extras.in_view_layer.unwrap_or(true) {
            self.link_to_view_layer(object_id);
        }

        for collection_name in &extras.collections {
            let collection_id = self.ensure_collection(collection_name);
            self.link_object_to_collection(object_id, collection_id);
        }

        // Set parent-child relationship if there's a parent
        if let Some(parent_id) = parent {
            self.set_object_parent(object_id, Some(parent_id));
        }

        for child in node.children() {
            self.spawn_gltf_node(buffers, &child, Some(object_id))?;
        }

        Ok(object_id)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_scene() -> (Scene, Vec<ObjectId>) {
        let mut scene = Scene::new();
        let mut ids = Vec::new();
        let mut parent = None;

        for (index, z) in [1.0, 0.2, 0.1].into_iter().enumerate() {
            let id = scene.add_object(
                Object3D::new(format!("level {index}"))
                    .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, z))),
            );
            scene.set_object_parent(id, parent);
            ids.push(id);
            parent = Some(id);
        }

        (scene, ids)
    }

    #[test]
    fn ancestors_run_from_root_to_parent() {
        let (scene, ids) = chain_scene();

        assert_eq!(scene.ancestors(ids[2]), vec![ids[0], ids[1]]);
        assert!(scene.ancestors(ids[0]).is_empty());

        assert_eq!(scene.get_object(ids[2]).unwrap().parent_id, Some(ids[1]));
        assert_eq!(scene.get_object(ids[0]).unwrap().child_ids, vec![ids[1]]);
    }

    #[test]
    fn host_world_composes_parent_inverse() {
        let (mut scene, ids) = chain_scene();

        let world = scene.host_world_matrix(ids[2]);
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, 1.3), 1e-6));

        // A stale parent inverse cancels the parent's offset.
        scene.get_object_mut(ids[1]).unwrap().parent_inverse =
            Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0));
        let world = scene.host_world_matrix(ids[2]);
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(0.0, 0.0, 0.3), 1e-6));
    }

    #[test]
    fn recorded_host_world_overrides_composition() {
        let (mut scene, ids) = chain_scene();
        let recorded = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        scene.get_object_mut(ids[1]).unwrap().host_world = Some(recorded);

        let world = scene.host_world_matrix(ids[2]);
        assert!(world
            .transform_point3(Vec3::ZERO)
            .abs_diff_eq(Vec3::new(5.0, 0.0, 0.1), 1e-6));
    }

    #[test]
    fn reparenting_updates_child_lists() {
        let (mut scene, ids) = chain_scene();

        scene.set_object_parent(ids[2], Some(ids[0]));

        assert!(scene.get_object(ids[1]).unwrap().child_ids.is_empty());
        assert_eq!(scene.get_object(ids[0]).unwrap().child_ids, vec![ids[1], ids[2]]);
        assert_eq!(scene.ancestors(ids[2]), vec![ids[0]]);
    }

    #[test]
    fn cycles_are_detected_and_do_not_hang_traversal() {
        let (mut scene, ids) = chain_scene();
        scene.get_object_mut(ids[0]).unwrap().parent_id = Some(ids[2]);

        assert!(scene.has_parent_cycle(ids[2]));
        assert!(scene.ancestors(ids[2]).len() <= 2);
    }

    #[test]
    fn collection_names_include_parent_collections() {
        let mut scene = Scene::new();
        let torso = scene.add_collection(Collection::new("Torso"));
        let muscles = scene.add_collection(Collection::new("Muscles of abdomen"));
        scene.set_collection_parent(muscles, Some(torso));

        let id = scene.add_object(Object3D::new("Rectus abdominis muscle"));
        scene.link_object_to_collection(id, muscles);
        scene.link_object_to_collection(id, torso);

        assert_eq!(scene.collection_names(id), vec!["Muscles of abdomen", "Torso"]);
    }
}
