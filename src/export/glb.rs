use anyhow::Context;
use indexmap::IndexSet;
use serde_json::{json, Value};

use crate::asset_pipeline::mesh_baker::{bake_meshes, BufferSlice};

use super::exporter::{ExportSettings, ModelExporter};
use super::staging::StagedMesh;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: &[u8; 4] = b"JSON";
const CHUNK_BIN: &[u8; 4] = b"BIN\0";

const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;
const MODE_TRIANGLES: u32 = 4;

/// Writes the selection as a single binary glTF 2.0 file.
#[derive(Debug, Default)]
pub struct GlbExporter {
    generator: String,
}

impl GlbExporter {
    pub fn new() -> Self {
        Self {
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Accumulates buffer views and accessors for one document.
#[derive(Default)]
struct Accessors {
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl Accessors {
    fn push(
        &mut self,
        slice: BufferSlice,
        component_type: u32,
        kind: &str,
        target: u32,
        bounds: Option<([f32; 3], [f32; 3])>,
    ) -> usize {
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": slice.byte_offset,
            "byteLength": slice.byte_length,
            "target": target,
        }));

        let mut accessor = json!({
            "bufferView": self.views.len() - 1,
            "componentType": component_type,
            "count": slice.count,
            "type": kind,
        });
        if let Some((min, max)) = bounds {
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }

        self.accessors.push(accessor);
        self.accessors.len() - 1
    }
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn write_glb(json: &[u8], bin: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut json_chunk = json.to_vec();
    pad_to_four(&mut json_chunk, b' ');
    let mut bin_chunk = bin.to_vec();
    pad_to_four(&mut bin_chunk, 0);

    let total_length = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let total_length = u32::try_from(total_length).context("Model exceeds the GLB size limit")?;

    let mut glb = Vec::with_capacity(total_length as usize);

    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_length.to_le_bytes());

    glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(CHUNK_JSON);
    glb.extend_from_slice(&json_chunk);

    glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    glb.extend_from_slice(CHUNK_BIN);
    glb.extend_from_slice(&bin_chunk);

    Ok(glb)
}

impl ModelExporter for GlbExporter {
    fn export_selection(
        &mut self,
        selection: &[StagedMesh],
        settings: &ExportSettings,
    ) -> anyhow::Result<Vec<u8>> {
        if selection.is_empty() {
            anyhow::bail!("Nothing selected for export");
        }
        if settings.compress_meshes {
            log::warn!("Mesh compression is not available, writing uncompressed buffers");
        }

        if let Some(staged) = selection.iter().find(|staged| !staged.mesh.has_geometry()) {
            anyhow::bail!("{} has no whole triangles", staged.mesh_id);
        }

        let baked = bake_meshes(selection, settings);

        let materials: IndexSet<&str> = if settings.include_materials {
            selection
                .iter()
                .filter_map(|staged| staged.mesh.material.as_deref())
                .collect()
        } else {
            IndexSet::new()
        };

        let mut accessors = Accessors::default();
        let mut meshes = Vec::with_capacity(selection.len());
        let mut nodes = Vec::with_capacity(selection.len());

        for (index, (staged, info)) in selection.iter().zip(&baked.meshes).enumerate() {
            let mut attributes = serde_json::Map::new();

            let bounds = (info.bounds.min.to_array(), info.bounds.max.to_array());
            attributes.insert(
                "POSITION".into(),
                json!(accessors.push(
                    info.positions,
                    COMPONENT_FLOAT,
                    "VEC3",
                    TARGET_ARRAY_BUFFER,
                    Some(bounds),
                )),
            );
            if let Some(slice) = info.normals {
                let accessor =
                    accessors.push(slice, COMPONENT_FLOAT, "VEC3", TARGET_ARRAY_BUFFER, None);
                attributes.insert("NORMAL".into(), json!(accessor));
            }
            if let Some(slice) = info.tex_coords {
                let accessor =
                    accessors.push(slice, COMPONENT_FLOAT, "VEC2", TARGET_ARRAY_BUFFER, None);
                attributes.insert("TEXCOORD_0".into(), json!(accessor));
            }
            if let Some(slice) = info.colors {
                let accessor =
                    accessors.push(slice, COMPONENT_FLOAT, "VEC4", TARGET_ARRAY_BUFFER, None);
                attributes.insert("COLOR_0".into(), json!(accessor));
            }

            let mut primitive = json!({
                "attributes": attributes,
                "mode": MODE_TRIANGLES,
            });
            if let Some(slice) = info.indices {
                primitive["indices"] = json!(accessors.push(
                    slice,
                    COMPONENT_UNSIGNED_INT,
                    "SCALAR",
                    TARGET_ELEMENT_ARRAY_BUFFER,
                    None,
                ));
            }
            if let Some(material) = staged
                .mesh
                .material
                .as_deref()
                .and_then(|name| materials.get_index_of(name))
            {
                primitive["material"] = json!(material);
            }

            meshes.push(json!({
                "name": staged.mesh_id,
                "primitives": [primitive],
            }));

            let mut node = json!({
                "name": staged.mesh_id,
                "mesh": index,
            });
            if staged.translation != glam::Vec3::ZERO {
                node["translation"] = json!(staged.translation.to_array());
            }
            nodes.push(node);

            log::debug!(
                "Packed {} ({} vertices)",
                staged.mesh_id,
                staged.mesh.vertex_count()
            );
        }

        let mut document = json!({
            "asset": { "version": "2.0", "generator": self.generator },
            "scene": 0,
            "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
            "nodes": nodes,
            "meshes": meshes,
            "accessors": accessors.accessors,
            "bufferViews": accessors.views,
            "buffers": [{ "byteLength": baked.buffer.len() }],
        });
        if !materials.is_empty() {
            document["materials"] = materials
                .iter()
                .map(|name| {
                    json!({
                        "name": name,
                        "pbrMetallicRoughness": { "baseColorFactor": [1.0, 1.0, 1.0, 1.0] },
                    })
                })
                .collect();
        }

        let json = serde_json::to_vec(&document).context("Failed to serialize glTF document")?;
        write_glb(&json, &baked.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MeshData;
    use glam::{Vec2, Vec3};

    fn staged(mesh_id: &str, translation: Vec3, material: Option<&str>) -> StagedMesh {
        StagedMesh {
            mesh_id: mesh_id.to_string(),
            translation,
            mesh: MeshData {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                normals: vec![Vec3::Z; 3],
                tex_coords: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
                indices: vec![0, 1, 2],
                material: material.map(String::from),
                ..Default::default()
            },
        }
    }

    fn selection() -> Vec<StagedMesh> {
        vec![
            staged("sternum", Vec3::new(0.0, 1.3, -0.1), Some("Bone")),
            staged("psoas_major_l", Vec3::new(0.05, 1.0, 0.0), Some("Muscle")),
            staged("psoas_major_r", Vec3::new(-0.05, 1.0, 0.0), Some("Muscle")),
        ]
    }

    #[test]
    fn written_file_parses_back_with_named_nodes() {
        let bytes = GlbExporter::new()
            .export_selection(&selection(), &ExportSettings::default())
            .unwrap();

        assert_eq!(&bytes[..4], b"glTF");
        assert_eq!(bytes.len() % 4, 0);

        let (document, buffers, _) = gltf::import_slice(&bytes).unwrap();
        let names: Vec<_> = document
            .nodes()
            .map(|node| node.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["sternum", "psoas_major_l", "psoas_major_r"]);
        assert_eq!(document.materials().count(), 2);

        let node = document.nodes().next().unwrap();
        let (translation, _, _) = node.transform().decomposed();
        assert_eq!(translation, [0.0, 1.3, -0.1]);

        let primitive = node.mesh().unwrap().primitives().next().unwrap();
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let positions: Vec<[f32; 3]> = reader.read_positions().unwrap().collect();
        assert_eq!(positions, vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert_eq!(primitive.bounding_box().max, [1.0, 1.0, 0.0]);
        assert!(reader.read_tex_coords(0).is_some());
    }

    #[test]
    fn disabled_attributes_keep_nodes_at_their_centers() {
        let settings = ExportSettings {
            include_materials: false,
            include_tex_coords: false,
            ..Default::default()
        };
        let bytes = GlbExporter::new()
            .export_selection(&selection(), &settings)
            .unwrap();

        let (document, buffers, _) = gltf::import_slice(&bytes).unwrap();
        assert_eq!(document.materials().count(), 0);

        let node = document.nodes().next().unwrap();
        assert_eq!(node.transform().decomposed().0, [0.0, 1.3, -0.1]);

        let primitive = node.mesh().unwrap().primitives().next().unwrap();
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let first = reader.read_positions().unwrap().next().unwrap();
        assert_eq!(first, [0.0, 0.0, 0.0]);
        assert!(reader.read_tex_coords(0).is_none());
    }

    #[test]
    fn meshes_without_whole_triangles_are_refused() {
        let mut points = staged("sternum", Vec3::ZERO, None);
        points.mesh = MeshData {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            ..Default::default()
        };

        assert!(GlbExporter::new()
            .export_selection(&[points], &ExportSettings::default())
            .is_err());
    }

    #[test]
    fn empty_selection_is_an_error() {
        assert!(GlbExporter::new()
            .export_selection(&[], &ExportSettings::default())
            .is_err());
    }
}
