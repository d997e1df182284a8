use serde::{Deserialize, Serialize};

use super::staging::StagedMesh;

/// Options forwarded to the binary model exporter.
///
/// Transforms are always baked: every node sits at its structure's center and
/// its geometry is relative to that pivot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Mesh compression is not available in-process; requesting it only logs a warning.
    pub compress_meshes: bool,
    pub include_tex_coords: bool,
    pub include_normals: bool,
    pub include_materials: bool,
    pub include_vertex_colors: bool,
    /// Convert geometry from the authoring Z-up frame to a Y-up frame.
    pub y_up: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            compress_meshes: true,
            include_tex_coords: true,
            include_normals: true,
            include_materials: true,
            include_vertex_colors: true,
            y_up: true,
        }
    }
}

/// Writes a binary model containing exactly the given selection.
pub trait ModelExporter {
    fn export_selection(
        &mut self,
        selection: &[StagedMesh],
        settings: &ExportSettings,
    ) -> anyhow::Result<Vec<u8>>;
}
