//! Core OSM data model: relations, members, and resolved sub-areas.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use geo::{Coord, MultiPolygon};
use serde::Deserialize;

use crate::osm::client::FetchError;

/// Relation ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub u64);

impl From<u64> for RelationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RelationId> for u64 {
    fn from(id: RelationId) -> Self {
        id.0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-form tag mapping. Ordered so serialized output is deterministic.
pub type Tags = BTreeMap<String, String>;

/// Kind of a relation member reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

/// A typed member reference inside a relation.
#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: MemberKind,
    #[serde(rename = "ref")]
    pub id: u64,
    #[serde(default)]
    pub role: String,
}

/// An OSM relation: identity, tags, and ordered member references.
///
/// Geometry is absent here; it is assembled from the way/node elements
/// delivered alongside the relation (see [`RelationBundle`]).
#[derive(Debug, Clone)]
pub struct Relation {
    pub id: RelationId,
    pub tags: Tags,
    pub members: Vec<Member>,
}

impl Relation {
    /// IDs of members that are sub-area relations, in member order.
    ///
    /// Administrative relations reference their children with the
    /// `subarea` role (the `subarea:FIXME` variant appears in the wild).
    pub fn subarea_members(&self) -> Vec<RelationId> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Relation && is_subarea_role(&m.role))
            .map(|m| RelationId(m.id))
            .collect()
    }
}

fn is_subarea_role(role: &str) -> bool {
    role == "subarea" || role.starts_with("subarea:")
}

/// The polyline of one way member, keyed by way id for deterministic
/// ring ordering.
#[derive(Debug, Clone)]
pub struct WayGeometry {
    pub id: u64,
    pub line: Vec<Coord<f64>>,
}

/// A relation together with the geometry-bearing elements fetched with it.
#[derive(Debug, Clone)]
pub struct RelationBundle {
    pub relation: Relation,
    pub ways: Vec<WayGeometry>,
}

/// One element of the OSM API's flat element soup.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: u64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: u64,
        #[serde(default)]
        nodes: Vec<u64>,
    },
    Relation {
        id: u64,
        #[serde(default)]
        members: Vec<Member>,
        #[serde(default)]
        tags: Tags,
    },
}

impl RelationBundle {
    /// Assemble a bundle from the element soup returned by a
    /// `relation/{id}/full` fetch.
    ///
    /// Way members with node references missing from the soup are dropped;
    /// the relation element itself must be present.
    pub fn from_elements(id: RelationId, elements: Vec<Element>) -> Result<Self, FetchError> {
        let mut nodes: HashMap<u64, Coord<f64>> = HashMap::new();
        let mut way_nodes: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut relation = None;

        for element in elements {
            match element {
                Element::Node { id, lat, lon } => {
                    nodes.insert(id, Coord { x: lon, y: lat });
                }
                Element::Way { id, nodes } => {
                    way_nodes.insert(id, nodes);
                }
                Element::Relation {
                    id: rel_id,
                    members,
                    tags,
                } if rel_id == id.0 => {
                    relation = Some(Relation {
                        id,
                        tags,
                        members,
                    });
                }
                // Nested relation elements are fetched on their own when
                // the resolver expands them.
                Element::Relation { .. } => {}
            }
        }

        let relation = relation.ok_or(FetchError::MissingRelation(id))?;

        let mut ways = Vec::new();
        for member in &relation.members {
            if member.kind != MemberKind::Way {
                continue;
            }
            let Some(refs) = way_nodes.get(&member.id) else {
                tracing::debug!(relation = %id, way = member.id, "way element missing from response");
                continue;
            };
            let line: Vec<Coord<f64>> = refs.iter().filter_map(|n| nodes.get(n).copied()).collect();
            if line.len() == refs.len() && !line.is_empty() {
                ways.push(WayGeometry {
                    id: member.id,
                    line,
                });
            } else {
                tracing::debug!(relation = %id, way = member.id, "way has unresolved nodes, dropped");
            }
        }

        Ok(Self { relation, ways })
    }
}

/// A resolved sub-area: source relation id, emitted tags, geometry, and
/// the identity key used for merge grouping.
#[derive(Debug, Clone)]
pub struct SubArea {
    pub id: RelationId,
    pub tags: Tags,
    pub geometry: MultiPolygon<f64>,
    /// Derived from the normalized name and admin level, regardless of
    /// whether tags are emitted raw or normalized.
    pub identity_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soup() -> Vec<Element> {
        serde_json::from_str(
            r#"[
                {"type": "node", "id": 1, "lat": 1.0, "lon": 0.0},
                {"type": "node", "id": 2, "lat": 1.0, "lon": 1.0},
                {"type": "node", "id": 3, "lat": 0.0, "lon": 1.0},
                {"type": "way", "id": 10, "nodes": [1, 2, 3, 1]},
                {"type": "relation", "id": 100, "members": [
                    {"type": "way", "ref": 10, "role": "outer"},
                    {"type": "relation", "ref": 200, "role": "subarea"},
                    {"type": "relation", "ref": 300, "role": "label"}
                ], "tags": {"name": "Testshire"}}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn bundle_from_element_soup() {
        let bundle = RelationBundle::from_elements(RelationId(100), soup()).unwrap();
        assert_eq!(bundle.relation.id, RelationId(100));
        assert_eq!(bundle.relation.tags.get("name").unwrap(), "Testshire");
        assert_eq!(bundle.ways.len(), 1);
        assert_eq!(bundle.ways[0].id, 10);
        assert_eq!(bundle.ways[0].line.len(), 4);
    }

    #[test]
    fn subarea_members_filters_roles() {
        let bundle = RelationBundle::from_elements(RelationId(100), soup()).unwrap();
        assert_eq!(bundle.relation.subarea_members(), vec![RelationId(200)]);
    }

    #[test]
    fn missing_relation_element_is_an_error() {
        let elements: Vec<Element> =
            serde_json::from_str(r#"[{"type": "node", "id": 1, "lat": 0.0, "lon": 0.0}]"#).unwrap();
        let err = RelationBundle::from_elements(RelationId(5), elements).unwrap_err();
        assert!(matches!(err, FetchError::MissingRelation(RelationId(5))));
    }
}
