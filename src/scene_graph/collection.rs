use id_arena::Id;

pub type CollectionId = Id<Collection>;

/// A named group of objects. Collections nest through `parent_id`.
pub struct Collection {
    pub name: String,
    pub parent_id: Option<CollectionId>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
        }
    }
}
