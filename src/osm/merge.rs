//! Combining logically-equivalent sub-areas into one record.

use std::collections::BTreeMap;

use geo::MultiPolygon;

use crate::osm::types::SubArea;

/// Merge sub-areas that share an identity key.
///
/// With `combine` unset this is a pass-through. Otherwise each identity
/// group collapses to a single record: the tags of the lowest-id member,
/// and the concatenation of every member's polygons in member-id order.
/// Singleton groups go through the same wrapping, so output shape does
/// not depend on group size. Grouping and ordering are id-driven, which
/// makes the result independent of input order.
pub fn merge(subareas: Vec<SubArea>, combine: bool) -> Vec<SubArea> {
    if !combine {
        return subareas;
    }

    let mut groups: BTreeMap<String, Vec<SubArea>> = BTreeMap::new();
    for subarea in subareas {
        groups
            .entry(subarea.identity_key.clone())
            .or_default()
            .push(subarea);
    }

    let mut merged: Vec<SubArea> = groups
        .into_values()
        .map(|mut members| {
            members.sort_by_key(|s| s.id);
            let mut polygons = Vec::new();
            for member in &members {
                polygons.extend(member.geometry.0.iter().cloned());
            }
            let first = members.remove(0);
            SubArea {
                id: first.id,
                tags: first.tags,
                geometry: MultiPolygon(polygons),
                identity_key: first.identity_key,
            }
        })
        .collect();

    merged.sort_by_key(|s| s.id);
    merged
}
