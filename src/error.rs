use thiserror::Error;

/// Failure of a whole export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no candidate structures found in the scene")]
    NoCandidates,

    #[error("no structures left to export ({failed} failed, {invalid} with implausible positions)")]
    NothingExported { failed: usize, invalid: usize },

    #[error("model exporter failed")]
    Exporter(#[source] anyhow::Error),
}

/// Failure to process a single object. The run skips the object and continues.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object has no mesh")]
    MissingMesh,

    #[error("mesh has no vertices")]
    EmptyGeometry,

    #[error("mesh contains non-finite vertex positions")]
    NonFiniteGeometry,

    #[error("{attribute} has {actual} entries, expected {expected}")]
    MismatchedAttribute {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid triangle indices: {0}")]
    InvalidIndices(String),

    #[error("world placement is singular")]
    DegenerateTransform,
}

/// Failure to build a scene from a dump.
#[derive(Debug, Error)]
pub enum SceneLoadError {
    #[error("object {object} references unknown parent {parent}")]
    UnknownParent { object: String, parent: String },

    #[error("{owner} references unknown collection {collection}")]
    UnknownCollection { owner: String, collection: String },

    #[error("parent chain of {0} contains a cycle")]
    ParentCycle(String),

    #[error("duplicate object name {0}")]
    DuplicateObject(String),

    #[error("duplicate collection name {0}")]
    DuplicateCollection(String),
}
