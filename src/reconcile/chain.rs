use glam::{Affine3A, Mat4, Vec3};

use crate::reconcile::ReconcileMethod;
use crate::scene_graph::{ObjectId, Scene, Transform};

/// Everything the reconciler needs to know about an object's placement, detached
/// from the scene so it can be built by hand in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformChain {
    pub local: Transform,
    /// World matrix as the host evaluates it.
    pub host_world: Mat4,
    /// Local translations of the ancestors, root first.
    pub ancestor_translations: Vec<Vec3>,
}

impl TransformChain {
    pub fn from_scene(scene: &Scene, object_id: ObjectId) -> Option<Self> {
        let object = scene.get_object(object_id)?;

        let ancestor_translations = scene
            .ancestors(object_id)
            .into_iter()
            .filter_map(|id| scene.get_object(id))
            .map(|ancestor| ancestor.transform.translation())
            .collect();

        Some(Self {
            local: object.transform,
            host_world: scene.host_world_matrix(object_id),
            ancestor_translations,
        })
    }

    /// Plain vector sum of the object's and every ancestor's local translation.
    pub fn location_sum(&self) -> Vec3 {
        self.ancestor_translations.iter().copied().sum::<Vec3>() + self.local.translation()
    }

    pub fn composed_chain_placement(&self) -> Affine3A {
        Affine3A::from_mat4(self.host_world)
    }

    /// The object's own rotation and scale, anchored at the location sum.
    pub fn location_sum_placement(&self) -> Affine3A {
        Affine3A::from_mat3_translation(self.local.linear_matrix(), self.location_sum())
    }

    pub fn placement(&self, method: ReconcileMethod) -> Option<Affine3A> {
        match method {
            ReconcileMethod::ComposedChain => Some(self.composed_chain_placement()),
            ReconcileMethod::LocationSum => Some(self.location_sum_placement()),
            ReconcileMethod::Invalid => None,
        }
    }
}
