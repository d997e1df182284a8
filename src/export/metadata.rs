use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::{Region, StructureType};

/// One exported structure, as the renderer reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRecord {
    pub mesh_id: String,
    pub original_name: String,
    #[serde(rename = "type")]
    pub structure_type: StructureType,
    pub layer: u8,
    pub regions: Vec<Region>,
    /// Consumer-space (Y up) centroid, rounded to 4 decimals.
    pub center: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub version: String,
    pub source: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_notes: Option<String>,
    pub structures: IndexMap<String, StructureRecord>,
}

impl MetadataDocument {
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata")
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse metadata")
    }
}
