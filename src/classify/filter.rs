use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{contains_any, lowercase_all};
use crate::scene_graph::{ObjectId, Scene};

/// Name vocabularies deciding which scene objects belong to the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterVocabulary {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Name endings marking alternate variants of a structure.
    pub exclude_suffixes: Vec<String>,
}

impl Default for FilterVocabulary {
    fn default() -> Self {
        let include = [
            // Thorax
            "thorax", "thoracic", "chest", "rib", "costa", "costal", "sternum", "sternal",
            "intercostal", "pector", "pectoral", "serratus", "diaphragm",
            // Abdomen
            "abdomen", "abdominal", "abdominis", "rectus", "oblique", "transvers", "lumbar",
            "lumbo", "psoas", "iliacus", "quadratus",
            // Spine
            "vertebra", "vertebrae", "vertebral", "spine", "spinal", "erector", "spinalis",
            "longissimus", "iliocostalis", "multifid",
            // Pelvis
            "pelvis", "pelvic", "ilium", "iliac", "ischium", "ischial", "pubis", "pubic",
            "sacrum", "sacral", "coccyx", "coccygeal", "gluteus", "gluteal", "inguinal",
            "symphysis",
            // Back
            "latissimus", "dorsi", "trapezius", "rhomboid",
        ];

        let exclude = [
            "arm", "brachial", "brachii", "forearm", "antebrachial", "hand", "carpal",
            "metacarpal", "phalanx", "phalang", "leg", "femoral", "femur", "thigh", "knee",
            "patella", "calf", "crural", "foot", "tarsal", "metatarsal", "plantae", "head",
            "cranial", "cranium", "face", "facial", "neck", "cervical", "skull", "mandible",
            "maxilla", "eye", "ocular", "ear", "auricul", "nose", "nasal", "tongue", "lingual",
            "teeth", "dental", "brain", "cerebr", "shoulder", "scapula", "clavicle", "humerus",
        ];

        Self {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            exclude_suffixes: ["_ol", "_or", "_el", "_er"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Why an object was left out of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Error)]
pub enum Rejection {
    #[error("no renderable geometry")]
    NoGeometry,
    #[error("not in the active view layer")]
    NotInViewLayer,
    #[error("name matches an exclude pattern")]
    ExcludedName,
    #[error("name ends with a variant suffix")]
    ExcludedSuffix,
    #[error("no include pattern in name or collections")]
    NoIncludeMatch,
}

pub struct InclusionFilter {
    vocabulary: FilterVocabulary,
}

impl InclusionFilter {
    pub fn new(vocabulary: &FilterVocabulary) -> Self {
        Self {
            vocabulary: FilterVocabulary {
                include: lowercase_all(&vocabulary.include),
                exclude: lowercase_all(&vocabulary.exclude),
                exclude_suffixes: lowercase_all(&vocabulary.exclude_suffixes),
            },
        }
    }

    pub fn include(&self, scene: &Scene, object_id: ObjectId) -> bool {
        self.evaluate(scene, object_id).is_ok()
    }

    pub fn evaluate(&self, scene: &Scene, object_id: ObjectId) -> Result<(), Rejection> {
        let object = scene.get_object(object_id).ok_or(Rejection::NoGeometry)?;

        if !object.has_geometry() {
            return Err(Rejection::NoGeometry);
        }

        if !scene.is_in_view_layer(object_id) {
            return Err(Rejection::NotInViewLayer);
        }

        self.match_name(&object.name, &scene.collection_names(object_id))
    }

    /// Name and collection checks, independent of the scene.
    pub fn match_name(&self, name: &str, collections: &[&str]) -> Result<(), Rejection> {
        let name = name.to_lowercase();

        if contains_any(&name, &self.vocabulary.exclude) {
            return Err(Rejection::ExcludedName);
        }

        if self
            .vocabulary
            .exclude_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
        {
            return Err(Rejection::ExcludedSuffix);
        }

        if contains_any(&name, &self.vocabulary.include) {
            return Ok(());
        }

        let in_included_collection = collections
            .iter()
            .any(|collection| contains_any(&collection.to_lowercase(), &self.vocabulary.include));

        if in_included_collection {
            Ok(())
        } else {
            Err(Rejection::NoIncludeMatch)
        }
    }
}
