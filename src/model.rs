use glam::{Vec2, Vec3, Vec4};
use gltf::buffer;
use itertools::Itertools;

use crate::error::ObjectError;

/// Geometry of a single scene object, in the object's local space.
///
/// Optional attributes are either empty or hold exactly one entry per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub indices: Vec<u32>,
    pub material: Option<String>,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of whole triangles. Without indices, every three positions form one.
    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            if self.positions.len() % 3 == 0 {
                self.positions.len() / 3
            } else {
                0
            }
        } else {
            self.indices.len() / 3
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.triangle_count() > 0
    }

    pub fn validate(&self) -> Result<(), ObjectError> {
        let count = self.positions.len();

        if count == 0 {
            return Err(ObjectError::EmptyGeometry);
        }

        if !self.positions.iter().all(|position| position.is_finite()) {
            return Err(ObjectError::NonFiniteGeometry);
        }

        let attribute_lengths = [
            ("normals", self.normals.len()),
            ("tex_coords", self.tex_coords.len()),
            ("colors", self.colors.len()),
        ];

        for (attribute, actual) in attribute_lengths {
            if actual != 0 && actual != count {
                return Err(ObjectError::MismatchedAttribute {
                    attribute,
                    expected: count,
                    actual,
                });
            }
        }

        if self.indices.len() % 3 != 0 {
            return Err(ObjectError::InvalidIndices(format!(
                "{} indices do not form whole triangles",
                self.indices.len()
            )));
        }

        if self.indices.is_empty() && count % 3 != 0 {
            return Err(ObjectError::InvalidIndices(format!(
                "{count} unindexed vertices do not form whole triangles"
            )));
        }

        if let Some(index) = self.indices.iter().find(|&&index| index as usize >= count) {
            return Err(ObjectError::InvalidIndices(format!(
                "index {index} out of range for {count} vertices"
            )));
        }

        Ok(())
    }

    /// Reverses the winding order of every triangle.
    pub fn flip_winding(&mut self) {
        for triangle in self.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }

    /// Reads every triangle primitive of a glTF mesh into one local-space buffer.
    pub fn from_gltf(mesh: gltf::Mesh, buffers: Buffers) -> anyhow::Result<MeshData> {
        let mut data = MeshData::default();
        let name = mesh.name().unwrap_or("Unnamed").to_string();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(anyhow::anyhow!(
                    "Unsupported primitive mode in {}: {:?}",
                    name,
                    primitive.mode()
                ));
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
            let base_vertex = data.positions.len() as u32;

            let positions = reader
                .read_positions()
                .ok_or_else(|| anyhow::anyhow!("Primitive without positions in {}", name))?
                .map(Vec3::from)
                .collect_vec();
            let vertex_count = positions.len();

            if let Some(normals) = reader.read_normals() {
                data.normals.extend(normals.map(Vec3::from));
            }
            if let Some(tex_coords) = reader.read_tex_coords(0) {
                data.tex_coords
                    .extend(tex_coords.into_f32().map(Vec2::from));
            }
            if let Some(colors) = reader.read_colors(0) {
                data.colors.extend(colors.into_rgba_f32().map(Vec4::from));
            }

            match reader.read_indices() {
                Some(indices) => data
                    .indices
                    .extend(indices.into_u32().map(|index| index + base_vertex)),
                None => data
                    .indices
                    .extend((0..vertex_count as u32).map(|index| index + base_vertex)),
            }

            if data.material.is_none() {
                data.material = primitive.material().name().map(String::from);
            }

            data.positions.extend(positions);
        }

        if data.positions.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", name));
        }

        // Attributes present on only some primitives cannot be exported per vertex.
        let count = data.positions.len();
        if data.normals.len() != count {
            data.normals.clear();
        }
        if data.tex_coords.len() != count {
            data.tex_coords.clear();
        }
        if data.colors.len() != count {
            data.colors.clear();
        }

        Ok(data)
    }
}
