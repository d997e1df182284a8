use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureType {
    Bone,
    Muscle,
    Tendon,
    Ligament,
    Cartilage,
    Organ,
    Fascia,
    Other,
}

impl StructureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureType::Bone => "bone",
            StructureType::Muscle => "muscle",
            StructureType::Tendon => "tendon",
            StructureType::Ligament => "ligament",
            StructureType::Cartilage => "cartilage",
            StructureType::Organ => "organ",
            StructureType::Fascia => "fascia",
            StructureType::Other => "other",
        }
    }

    /// Depth from the skin surface for types whose layer does not depend on the name.
    pub fn fixed_layer(&self) -> Option<u8> {
        match self {
            StructureType::Bone | StructureType::Organ | StructureType::Cartilage => Some(0),
            StructureType::Ligament | StructureType::Tendon => Some(1),
            StructureType::Fascia => Some(4),
            StructureType::Muscle | StructureType::Other => None,
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body region tags. The declaration order is the order regions are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Thorax,
    Abdomen,
    Pelvis,
    LumbarSpine,
    ThoracicSpine,
    Torso,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Thorax => "thorax",
            Region::Abdomen => "abdomen",
            Region::Pelvis => "pelvis",
            Region::LumbarSpine => "lumbar_spine",
            Region::ThoracicSpine => "thoracic_spine",
            Region::Torso => "torso",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub structure_type: StructureType,
    pub layer: u8,
    /// Never empty, sorted, without duplicates.
    pub regions: Vec<Region>,
    /// Set when no rule matched and the type fell back to `other`.
    pub needs_review: bool,
}
