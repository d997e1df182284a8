use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classify::structure::{Classification, Region, StructureType};
use crate::classify::{contains_any, lowercase_all};

/// Keywords that map to a structure type when any of them occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    #[serde(rename = "type")]
    pub structure_type: StructureType,
    pub keywords: Vec<String>,
}

/// Adds `region` when any of `any` occurs and every entry of `all` occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    pub region: Region,
    #[serde(default)]
    pub any: Vec<String>,
    #[serde(default)]
    pub all: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierTables {
    /// Checked against the name first. The most specific signal.
    pub name_keywords: Vec<KeywordRule>,
    /// Checked against collection names, in rule order, per collection.
    pub collection_types: Vec<KeywordRule>,
    /// Broad name keywords used when neither of the above matched.
    pub fallback_keywords: Vec<KeywordRule>,
    pub deep_muscle: Vec<String>,
    pub intermediate_muscle: Vec<String>,
    pub regions: Vec<RegionRule>,
}

fn rule(structure_type: StructureType, keywords: &[&str]) -> KeywordRule {
    KeywordRule {
        structure_type,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
    }
}

fn region(region: Region, any: &[&str], all: &[&str]) -> RegionRule {
    RegionRule {
        region,
        any: any.iter().map(|s| s.to_string()).collect(),
        all: all.iter().map(|s| s.to_string()).collect(),
    }
}

impl Default for ClassifierTables {
    fn default() -> Self {
        use StructureType::*;

        Self {
            name_keywords: vec![
                rule(Fascia, &["fascia", "aponeurosis"]),
                rule(Ligament, &["ligament", "ligamentum"]),
                rule(Tendon, &["tendon"]),
                rule(Cartilage, &["disc", "meniscus", "symphysis"]),
            ],
            collection_types: vec![
                rule(Bone, &["bones", "skeleton", "skeletal"]),
                rule(Muscle, &["muscles", "muscular"]),
                rule(Tendon, &["tendons"]),
                rule(Ligament, &["ligaments"]),
                rule(Cartilage, &["cartilage"]),
                rule(Organ, &["organs", "viscera"]),
                rule(Fascia, &["fascia"]),
                rule(Cartilage, &["joints"]),
            ],
            fallback_keywords: vec![
                rule(Bone, &["bone", "vertebra", "rib", "sternum", "pelvis", "sacrum"]),
                rule(Muscle, &["muscle", "musculus", "abdominis", "dorsi", "pector"]),
            ],
            deep_muscle: ["transvers", "multifid", "rotat", "intercost", "diaphragm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            intermediate_muscle: ["oblique", "erector", "serratus", "internal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            regions: vec![
                region(
                    Region::Thorax,
                    &[
                        "thorax",
                        "thoracic",
                        "rib",
                        "sternum",
                        "pector",
                        "intercost",
                        "erector",
                        "latissimus",
                    ],
                    &[],
                ),
                region(
                    Region::Abdomen,
                    &[
                        "abdomen",
                        "abdomin",
                        "rectus",
                        "oblique",
                        "transvers",
                        "erector",
                        "latissimus",
                        "psoas",
                    ],
                    &[],
                ),
                region(
                    Region::Pelvis,
                    &[
                        "pelvis", "pelvic", "ilium", "iliac", "ischium", "pubis", "pubic", "sacrum",
                        "coccyx", "gluteus", "inguinal", "symphysis", "psoas",
                    ],
                    &[],
                ),
                region(Region::LumbarSpine, &["lumbar", "lumbo"], &[]),
                region(Region::ThoracicSpine, &[], &["thoracic", "vertebra"]),
            ],
        }
    }
}

/// Maps structure names and collection memberships to type, layer and regions.
pub struct NameClassifier {
    tables: ClassifierTables,
}

impl NameClassifier {
    pub fn new(tables: &ClassifierTables) -> Self {
        let lower_rules = |rules: &[KeywordRule]| -> Vec<KeywordRule> {
            rules
                .iter()
                .map(|rule| KeywordRule {
                    structure_type: rule.structure_type,
                    keywords: lowercase_all(&rule.keywords),
                })
                .collect()
        };

        Self {
            tables: ClassifierTables {
                name_keywords: lower_rules(&tables.name_keywords),
                collection_types: lower_rules(&tables.collection_types),
                fallback_keywords: lower_rules(&tables.fallback_keywords),
                deep_muscle: lowercase_all(&tables.deep_muscle),
                intermediate_muscle: lowercase_all(&tables.intermediate_muscle),
                regions: tables
                    .regions
                    .iter()
                    .map(|rule| RegionRule {
                        region: rule.region,
                        any: lowercase_all(&rule.any),
                        all: lowercase_all(&rule.all),
                    })
                    .collect(),
            },
        }
    }

    pub fn classify(&self, name: &str, collections: &[&str]) -> Classification {
        let name = name.to_lowercase();

        let (structure_type, needs_review) = match self.resolve_type(&name, collections) {
            Some(structure_type) => (structure_type, false),
            None => (StructureType::Other, true),
        };

        let layer = structure_type
            .fixed_layer()
            .unwrap_or_else(|| self.muscle_layer(&name));

        Classification {
            structure_type,
            layer,
            regions: self.regions(&name),
            needs_review,
        }
    }

    fn resolve_type(&self, name: &str, collections: &[&str]) -> Option<StructureType> {
        if let Some(structure_type) = first_match(&self.tables.name_keywords, name) {
            return Some(structure_type);
        }

        for collection in collections {
            let collection = collection.to_lowercase();
            if let Some(structure_type) = first_match(&self.tables.collection_types, &collection) {
                return Some(structure_type);
            }
        }

        first_match(&self.tables.fallback_keywords, name)
    }

    fn muscle_layer(&self, name: &str) -> u8 {
        if contains_any(name, &self.tables.deep_muscle) {
            1
        } else if contains_any(name, &self.tables.intermediate_muscle) {
            2
        } else {
            3
        }
    }

    fn regions(&self, name: &str) -> Vec<Region> {
        let mut regions: BTreeSet<Region> = self
            .tables
            .regions
            .iter()
            .filter(|rule| !(rule.any.is_empty() && rule.all.is_empty()))
            .filter(|rule| rule.any.is_empty() || contains_any(name, &rule.any))
            .filter(|rule| rule.all.iter().all(|keyword| name.contains(keyword.as_str())))
            .map(|rule| rule.region)
            .collect();

        if regions.is_empty() {
            regions.insert(Region::Torso);
        }

        regions.into_iter().collect()
    }
}

fn first_match(rules: &[KeywordRule], haystack: &str) -> Option<StructureType> {
    rules
        .iter()
        .find(|rule| contains_any(haystack, &rule.keywords))
        .map(|rule| rule.structure_type)
}
