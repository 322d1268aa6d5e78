//! GeoJSON emission for resolved sub-areas.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::osm::types::SubArea;

/// Build the feature collection for a set of sub-areas.
///
/// Feature order follows the input (the resolver hands sub-areas over
/// id-sorted). A sub-area whose ways produced no closed ring gets a null
/// geometry rather than an empty multi-polygon.
pub fn feature_collection(subareas: &[SubArea]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: subareas.iter().map(feature).collect(),
        foreign_members: None,
    }
}

fn feature(subarea: &SubArea) -> Feature {
    let geometry = if subarea.geometry.0.is_empty() {
        None
    } else {
        Some(Geometry::new(geojson::Value::from(&subarea.geometry)))
    };

    let mut properties = JsonObject::new();
    for (key, value) in &subarea.tags {
        properties.insert(key.clone(), JsonValue::String(value.clone()));
    }

    Feature {
        bbox: None,
        geometry,
        id: Some(Id::Number(subarea.id.0.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}
