use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FootprintTilerError, Result};
use crate::types::{AttributeValue, Attributes, Feature, Footprint};

#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct GeometryDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

type Ring = Vec<Vec<f64>>;

/// Load a GeoJSON FeatureCollection into the in-memory feature table.
pub fn load_geojson(path: &Path) -> Result<Vec<Feature>> {
    let text = fs::read_to_string(path).map_err(|e| {
        FootprintTilerError::Input(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_feature_collection(&text)
}

/// Parse GeoJSON text. Every input feature yields exactly one row, so row
/// indices match the source order; unusable geometries become empty rings.
pub fn parse_feature_collection(text: &str) -> Result<Vec<Feature>> {
    let doc: FeatureCollectionDoc = serde_json::from_str(text)
        .map_err(|e| FootprintTilerError::Input(format!("Invalid GeoJSON: {e}")))?;
    if doc.kind != "FeatureCollection" {
        return Err(FootprintTilerError::Input(format!(
            "Expected a FeatureCollection, found {:?}",
            doc.kind
        )));
    }

    let mut ignored_holes = 0usize;
    let features = doc
        .features
        .into_iter()
        .enumerate()
        .map(|(index, f)| convert_feature(index, f, &mut ignored_holes))
        .collect();

    if ignored_holes > 0 {
        warn!(
            count = ignored_holes,
            "Interior rings ignored; footprints are extruded from exterior rings only"
        );
    }

    Ok(features)
}

fn convert_feature(index: usize, doc: FeatureDoc, ignored_holes: &mut usize) -> Feature {
    let properties = doc.properties.unwrap_or_default();

    let ring = match &doc.geometry {
        Some(geometry) => exterior_ring(index, geometry, ignored_holes),
        None => {
            debug!(index, "Feature has no geometry");
            Vec::new()
        }
    };

    let id = doc
        .id
        .as_ref()
        .and_then(scalar_to_string)
        .or_else(|| properties.get("id").and_then(scalar_to_string));

    let mut footprint = Footprint::from_coords(&ring);
    footprint.id = id;

    Feature {
        footprint,
        properties: convert_properties(properties),
    }
}

fn exterior_ring(index: usize, geometry: &GeometryDoc, ignored_holes: &mut usize) -> Vec<[f64; 2]> {
    let rings: Option<Vec<Ring>> = match geometry.kind.as_str() {
        "Polygon" => serde_json::from_value(geometry.coordinates.clone()).ok(),
        "MultiPolygon" => serde_json::from_value::<Vec<Vec<Ring>>>(geometry.coordinates.clone())
            .ok()
            .and_then(|polys| {
                if polys.len() > 1 {
                    debug!(index, parts = polys.len(), "Using first polygon of MultiPolygon");
                }
                polys.into_iter().next()
            }),
        other => {
            debug!(index, kind = other, "Unsupported geometry type");
            None
        }
    };

    let Some(rings) = rings else {
        return Vec::new();
    };
    *ignored_holes += rings.len().saturating_sub(1);

    rings
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pos| match pos.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some([*x, *y]),
            _ => None,
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Keep scalar properties; null, arrays and objects are dropped.
fn convert_properties(properties: serde_json::Map<String, Value>) -> Attributes {
    properties
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Number(n) => AttributeValue::Number(n.as_f64()?),
                Value::String(s) => AttributeValue::String(s),
                Value::Bool(b) => AttributeValue::Bool(b),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}
