use std::path::Path;

use geo::{BooleanOps, MultiPolygon};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::geom::{geometry_from_value, repair};

/// One administrative boundary polygon.
#[derive(Debug, Clone)]
pub struct BoundaryEntry {
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Read a property by name, falling back to its upper-case spelling.
pub(crate) fn property_str<'a>(properties: &'a Value, field: &str) -> Option<&'a str> {
    properties.get(field)
        .or_else(|| properties.get(field.to_uppercase()))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse boundary entries from a GeoJSON FeatureCollection.
/// Features without polygonal geometry are skipped.
pub fn boundaries_from_geojson(collection: &Value, name_field: &str) -> Result<Vec<BoundaryEntry>> {
    let mut entries = Vec::new();
    for (i, feature) in collection["features"].as_array().into_iter().flatten().enumerate() {
        let geometry = match geometry_from_value(&feature["geometry"]) {
            Ok(mp) => repair(&mp),
            Err(e) => {
                debug!("boundary feature {i} skipped: {e}");
                continue;
            }
        };
        let name = property_str(&feature["properties"], name_field).map(str::to_string);
        entries.push(BoundaryEntry { name, geometry });
    }
    Ok(entries)
}

/// Read boundary entries from a GeoJSON file in the canonical CRS.
pub fn read_boundaries(path: &Path, name_field: &str) -> Result<Vec<BoundaryEntry>> {
    let bytes = std::fs::read(path)?;
    let collection: Value = serde_json::from_slice(&bytes)?;
    boundaries_from_geojson(&collection, name_field)
}

/// Union of all boundary polygons.
/// May be slow for many complex polygons.
pub fn union_all(entries: &[BoundaryEntry]) -> MultiPolygon<f64> {
    entries.iter()
        .map(|entry| entry.geometry.clone())
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}
