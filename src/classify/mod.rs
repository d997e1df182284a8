pub mod classifier;
pub mod filter;
pub mod structure;

pub use classifier::{ClassifierTables, NameClassifier};
pub use filter::{FilterVocabulary, InclusionFilter, Rejection};
pub use structure::{Classification, Region, StructureType};

/// Whether `haystack` contains any of the (already lowercased) patterns.
pub(crate) fn contains_any(haystack: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| haystack.contains(pattern.as_str()))
}

pub(crate) fn lowercase_all(patterns: &[String]) -> Vec<String> {
    patterns.iter().map(|pattern| pattern.to_lowercase()).collect()
}
