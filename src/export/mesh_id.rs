use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn suffix(&self) -> &'static str {
        match self {
            Side::Left => "_l",
            Side::Right => "_r",
        }
    }
}

/// Side markers as they appear at the end of lowercase names, longest first.
const SIDE_MARKERS: &[(&str, Side)] = &[
    (" (left)", Side::Left),
    (" (right)", Side::Right),
    (" left", Side::Left),
    (" right", Side::Right),
    (".l", Side::Left),
    (".r", Side::Right),
    ("_l", Side::Left),
    ("_r", Side::Right),
];

/// Lowercase token with every run of non-alphanumeric characters collapsed to `_`.
pub fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Splits a trailing bilateral side marker off a lowercase name.
pub fn split_side(name: &str) -> (&str, Option<Side>) {
    SIDE_MARKERS
        .iter()
        .find_map(|(marker, side)| name.strip_suffix(marker).map(|base| (base, Some(*side))))
        .unwrap_or((name, None))
}

/// Mesh id for a display name. The side marker survives as a canonical suffix so
/// mirrored structures never share an id.
pub fn normalize_mesh_id(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let lower = lower.strip_suffix("_copy").unwrap_or(&lower);
    let (base, side) = split_side(lower);

    let mut id = slug(base);
    if id.is_empty() {
        id.push_str("structure");
    }
    if let Some(side) = side {
        id.push_str(side.suffix());
    }

    id
}

/// Hands out mesh ids that are unique within one export run.
#[derive(Debug, Default)]
pub struct MeshIdAllocator {
    used: HashSet<String>,
}

impl MeshIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let base = normalize_mesh_id(name);
        let mut id = base.clone();
        let mut counter = 1;

        while self.used.contains(&id) {
            id = format!("{base}_{counter}");
            counter += 1;
        }

        self.used.insert(id.clone());
        id
    }
}
