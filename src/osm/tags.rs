//! Tag normalization and merge-identity derivation.
//!
//! # Design Decisions
//! - Unrecognized tag keys pass through untouched
//! - The identity key is always computed from the normalized view, so
//!   raw mode changes emitted tags but never merge grouping

use crate::osm::types::Tags;

pub const KEY_NAME: &str = "name";
pub const KEY_OFFICIAL_NAME: &str = "official_name";
pub const KEY_ADMIN_LEVEL: &str = "admin_level";

/// Known spelling variants folded to one canonical key.
const SYNONYMS: &[(&str, &str)] = &[
    ("admin-level", KEY_ADMIN_LEVEL),
    ("adminlevel", KEY_ADMIN_LEVEL),
    ("official-name", KEY_OFFICIAL_NAME),
    ("alt-name", "alt_name"),
];

fn canonical_key(key: &str) -> String {
    let key = key.trim().to_lowercase();
    for (variant, canonical) in SYNONYMS {
        if key == *variant {
            return (*canonical).to_string();
        }
    }
    key
}

/// Canonicalize a tag mapping: trim whitespace, lower-case keys, fold
/// known synonym keys. When folding collides with an entry that already
/// carries the canonical key, the canonical entry wins.
pub fn normalize(tags: &Tags) -> Tags {
    let mut out = Tags::new();
    // Exact canonical keys first so synonym folds cannot displace them.
    for (key, value) in tags {
        let canonical = canonical_key(key);
        if canonical == key.trim() {
            out.insert(canonical, value.trim().to_string());
        }
    }
    for (key, value) in tags {
        let canonical = canonical_key(key);
        out.entry(canonical).or_insert_with(|| value.trim().to_string());
    }
    out
}

/// Derive the grouping key for a sub-area from its *normalized* tags.
///
/// Logically-equivalent areas share a case-folded name and admin level.
/// Areas without a usable name never group together; they get a key that
/// is unique per formatting of the empty name.
pub fn identity_key(normalized: &Tags) -> String {
    let name = normalized
        .get(KEY_NAME)
        .or_else(|| normalized.get(KEY_OFFICIAL_NAME))
        .map(|n| n.to_lowercase())
        .unwrap_or_default();
    let level = normalized.get(KEY_ADMIN_LEVEL).cloned().unwrap_or_default();
    format!("{name}|{level}")
}
