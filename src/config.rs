use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::classify::{ClassifierTables, FilterVocabulary};
use crate::export::ExportSettings;
use crate::reconcile::{SelectionPolicy, ValidityBounds};

/// Document-level labels written into the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataLabels {
    pub version: String,
    pub source: String,
    pub region: String,
    pub export_notes: Option<String>,
}

impl Default for MetadataLabels {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            source: "Z-Anatomy".to_string(),
            region: "torso".to_string(),
            export_notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub model_dir: PathBuf,
    pub model_file: String,
    pub metadata_dir: PathBuf,
    pub metadata_file: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("public/models"),
            model_file: "torso.glb".to_string(),
            metadata_dir: PathBuf::from("public/data"),
            metadata_file: "torso_metadata.json".to_string(),
        }
    }
}

impl OutputPaths {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_dir.join(&self.metadata_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub metadata: MetadataLabels,
    /// Name of the temporary collection holding staged copies during a run.
    pub staging_collection: String,
    pub filter: FilterVocabulary,
    pub classifier: ClassifierTables,
    pub policy: SelectionPolicy,
    pub bounds: ValidityBounds,
    pub gltf: ExportSettings,
    pub output: OutputPaths,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataLabels::default(),
            staging_collection: "_EXPORT_TEMP_".to_string(),
            filter: FilterVocabulary::default(),
            classifier: ClassifierTables::default(),
            policy: SelectionPolicy::default(),
            bounds: ValidityBounds::default(),
            gltf: ExportSettings::default(),
            output: OutputPaths::default(),
        }
    }
}

impl ExportConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse export config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
    }
}
