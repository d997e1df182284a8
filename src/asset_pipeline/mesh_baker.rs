use bytemuck::Pod;
use glam::Vec3;

use crate::export::{ExportSettings, StagedMesh};
use crate::math::bounds::AABB;

/// A byte range inside the baked binary buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlice {
    pub byte_offset: usize,
    pub byte_length: usize,
    pub count: usize,
}

pub struct MeshInfo {
    pub positions: BufferSlice,
    pub bounds: AABB,
    pub normals: Option<BufferSlice>,
    pub tex_coords: Option<BufferSlice>,
    pub colors: Option<BufferSlice>,
    pub indices: Option<BufferSlice>,
}

pub struct BakedMeshes {
    pub buffer: Vec<u8>,
    pub meshes: Vec<MeshInfo>,
}

fn push_slice<T: Pod>(buffer: &mut Vec<u8>, items: &[T]) -> BufferSlice {
    // Accessor offsets must be multiples of the component size.
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }

    let byte_offset = buffer.len();
    buffer.extend_from_slice(bytemuck::cast_slice(items));

    BufferSlice {
        byte_offset,
        byte_length: buffer.len() - byte_offset,
        count: items.len(),
    }
}

fn push_optional<T: Pod>(buffer: &mut Vec<u8>, items: &[T], include: bool) -> Option<BufferSlice> {
    (include && !items.is_empty()).then(|| push_slice(buffer, items))
}

/// Packs the attributes of every staged mesh into one tightly packed buffer.
pub fn bake_meshes(selection: &[StagedMesh], settings: &ExportSettings) -> BakedMeshes {
    let mut buffer = Vec::new();
    let mut meshes = Vec::with_capacity(selection.len());

    for staged in selection {
        let mesh = &staged.mesh;

        let positions = push_slice(&mut buffer, &mesh.positions);
        let normals = push_optional(&mut buffer, &mesh.normals, settings.include_normals);
        let tex_coords =
            push_optional(&mut buffer, &mesh.tex_coords, settings.include_tex_coords);
        let colors = push_optional(&mut buffer, &mesh.colors, settings.include_vertex_colors);
        let indices = push_optional(&mut buffer, &mesh.indices, true);

        meshes.push(MeshInfo {
            positions,
            bounds: AABB::from_points(&mesh.positions)
                .unwrap_or(AABB::new(Vec3::ZERO, Vec3::ZERO)),
            normals,
            tex_coords,
            colors,
            indices,
        });
    }

    BakedMeshes { buffer, meshes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MeshData;
    use glam::Vec2;

    fn staged(positions: Vec<Vec3>, indices: Vec<u32>) -> StagedMesh {
        let count = positions.len();
        StagedMesh {
            mesh_id: "sternum".into(),
            translation: Vec3::ZERO,
            mesh: MeshData {
                positions,
                normals: vec![Vec3::Z; count],
                tex_coords: vec![Vec2::ZERO; count],
                indices,
                ..Default::default()
            },
        }
    }

    #[test]
    fn slices_are_aligned_and_contiguous() {
        let selection = [
            staged(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]),
            staged(vec![Vec3::ONE, Vec3::NEG_ONE, Vec3::Z], vec![]),
        ];

        let baked = bake_meshes(&selection, &ExportSettings::default());

        let first = &baked.meshes[0];
        assert_eq!(first.positions.byte_offset, 0);
        assert_eq!(first.positions.byte_length, 36);
        assert_eq!(first.normals.unwrap().byte_offset, 36);
        assert_eq!(first.tex_coords.unwrap().byte_length, 24);
        assert_eq!(first.indices.unwrap().count, 3);
        assert!(first.colors.is_none());

        let second = &baked.meshes[1];
        assert!(second.indices.is_none());
        assert_eq!(second.bounds.min, Vec3::NEG_ONE);
        assert_eq!(second.bounds.max, Vec3::ONE);

        for info in &baked.meshes {
            assert_eq!(info.positions.byte_offset % 4, 0);
        }
        let total: usize = 36 + 36 + 24 + 12 + 36 + 36 + 24;
        assert_eq!(baked.buffer.len(), total);
    }

    #[test]
    fn disabled_attributes_are_skipped() {
        let selection = [staged(vec![Vec3::ZERO], vec![])];
        let settings = ExportSettings {
            include_normals: false,
            include_tex_coords: false,
            ..Default::default()
        };

        let baked = bake_meshes(&selection, &settings);

        assert!(baked.meshes[0].normals.is_none());
        assert!(baked.meshes[0].tex_coords.is_none());
        assert_eq!(baked.buffer.len(), 12);
    }
}
