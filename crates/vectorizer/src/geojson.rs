//! GeoJSON output for pixel polygons and sketched regions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::builder::VectorFeature;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    /// Collection of pixel polygons, in the order given.
    pub fn from_features(features: &[VectorFeature]) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: features.iter().map(Feature::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Geometry,

    pub properties: Map<String, Value>,
}

impl Feature {
    /// Polygon feature with a single outer ring.
    pub fn polygon(ring: Vec<[f64; 2]>, properties: Map<String, Value>) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Geometry::polygon(ring),
            properties,
        }
    }
}

impl From<&VectorFeature> for Feature {
    fn from(feature: &VectorFeature) -> Self {
        let attrs = &feature.attributes;
        let mut properties = Map::new();
        properties.insert("ndvi".to_string(), json!(attrs.ndvi));
        properties.insert("evi".to_string(), json!(attrs.evi));
        properties.insert("date".to_string(), json!(attrs.date));
        properties.insert("row".to_string(), json!(attrs.row));
        properties.insert("col".to_string(), json!(attrs.col));
        properties.insert("fill".to_string(), json!(feature.color.to_hex()));

        Feature::polygon(feature.ring.to_vec(), properties)
    }
}

/// GeoJSON geometry (polygons only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub type_: String,

    /// Rings of `[lon, lat]` positions; the first ring is the outer boundary
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Geometry {
    pub fn polygon(ring: Vec<[f64; 2]>) -> Self {
        Self {
            type_: "Polygon".to_string(),
            coordinates: vec![ring],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FeatureAttributes;
    use crate::classify::Rgb;

    fn feature() -> VectorFeature {
        VectorFeature {
            ring: [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0], [0.0, 1.0]],
            color: Rgb(80, 160, 50),
            attributes: FeatureAttributes {
                ndvi: 0.5,
                evi: 0.25,
                date: "2024-01-10".to_string(),
                row: 3,
                col: 7,
            },
        }
    }

    #[test]
    fn test_feature_properties() {
        let f = Feature::from(&feature());
        assert_eq!(f.geometry.type_, "Polygon");
        assert_eq!(f.geometry.coordinates[0].len(), 5);
        assert_eq!(f.properties["ndvi"], 0.5);
        assert_eq!(f.properties["date"], "2024-01-10");
        assert_eq!(f.properties["row"], 3);
        assert_eq!(f.properties["col"], 7);
        assert_eq!(f.properties["fill"], "#50a032");
    }

    #[test]
    fn test_collection_serialization() {
        let collection = FeatureCollection::from_features(&[feature(), feature()]);
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0][1][0], 1.0);
    }

    #[test]
    fn test_nan_evi_serializes_as_null() {
        let mut f = feature();
        f.attributes.evi = f32::NAN;
        let value = serde_json::to_value(Feature::from(&f)).unwrap();
        assert!(value["properties"]["evi"].is_null());
    }
}
