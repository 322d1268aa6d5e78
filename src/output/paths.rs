//! Deterministic artifact naming.
//!
//! The three request axes (root id, raw, separated) are all encoded in
//! the file name, so mode variants can never collide on disk, and the
//! name parses back into the request that produced it.

use std::path::PathBuf;

use crate::osm::types::RelationId;

const EXTENSION: &str = ".geojson";

/// The fields that fully determine one output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub root: RelationId,
    /// Emit tags with their upstream spelling instead of normalized.
    pub raw: bool,
    /// Keep equivalent sub-areas separate instead of merging them.
    pub separate: bool,
    pub out_dir: PathBuf,
}

impl ResolutionRequest {
    /// File name for this request. Pure function of the request fields.
    pub fn artifact_name(&self) -> String {
        format!(
            "relation-{}-{}-{}{}",
            self.root,
            if self.raw { "raw" } else { "normalized" },
            if self.separate { "separated" } else { "combined" },
            EXTENSION,
        )
    }

    /// Full output path for this request.
    pub fn write_path(&self) -> PathBuf {
        self.out_dir.join(self.artifact_name())
    }

    /// Key under which concurrent computations of this artifact serialize.
    pub fn lock_key(&self) -> String {
        self.artifact_name()
    }
}

/// Invert [`ResolutionRequest::artifact_name`].
///
/// Returns the request axes when `name` is a well-formed artifact name,
/// `None` for anything else (including path separators smuggled in).
pub fn parse_artifact(name: &str) -> Option<(RelationId, bool, bool)> {
    let rest = name.strip_prefix("relation-")?.strip_suffix(EXTENSION)?;
    let mut parts = rest.split('-');
    let root: u64 = parts.next()?.parse().ok()?;
    let raw = match parts.next()? {
        "raw" => true,
        "normalized" => false,
        _ => return None,
    };
    let separate = match parts.next()? {
        "separated" => true,
        "combined" => false,
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((RelationId(root), raw, separate))
}
