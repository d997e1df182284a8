use glam::Vec3;

use crate::model::MeshData;

/// A processed copy of a scene object, ready for the model exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedMesh {
    pub mesh_id: String,
    /// Node translation: the object's centroid in export axes.
    pub translation: Vec3,
    /// Geometry relative to `translation`, in export axes.
    pub mesh: MeshData,
}

/// Temporary container holding exactly the copies one run exports.
///
/// Created per run and emptied on drop, so a failed run never leaves staged
/// copies behind for the next one.
pub struct StagingCollection {
    name: String,
    staged: Vec<StagedMesh>,
}

impl StagingCollection {
    pub fn create(name: impl Into<String>) -> Self {
        let name = name.into();
        log::debug!("Created staging collection {}", name);

        Self {
            name,
            staged: Vec::new(),
        }
    }

    pub fn stage(&mut self, mesh: StagedMesh) {
        self.staged.push(mesh);
    }

    /// The export selection: every staged copy and nothing else.
    pub fn selection(&self) -> &[StagedMesh] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Releases every staged copy, returning how many there were.
    pub fn teardown(&mut self) -> usize {
        let released = self.staged.len();
        self.staged.clear();
        released
    }
}

impl Drop for StagingCollection {
    fn drop(&mut self) {
        let released = self.teardown();
        log::debug!(
            "Removed staging collection {} ({} staged copies)",
            self.name,
            released
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(id: &str) -> StagedMesh {
        StagedMesh {
            mesh_id: id.to_string(),
            translation: Vec3::ZERO,
            mesh: MeshData {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                ..Default::default()
            },
        }
    }

    #[test]
    fn selection_is_exactly_the_staged_copies() {
        let mut staging = StagingCollection::create("_EXPORT_TEMP_");
        staging.stage(staged("sternum"));
        staging.stage(staged("rib_1"));

        let ids: Vec<_> = staging.selection().iter().map(|m| m.mesh_id.as_str()).collect();
        assert_eq!(ids, vec!["sternum", "rib_1"]);
    }

    #[test]
    fn teardown_releases_everything() {
        let mut staging = StagingCollection::create("_EXPORT_TEMP_");
        staging.stage(staged("sternum"));

        assert_eq!(staging.teardown(), 1);
        assert!(staging.is_empty());
        assert_eq!(staging.teardown(), 0);
    }
}
