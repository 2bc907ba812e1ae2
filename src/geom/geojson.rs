use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};

use crate::error::{Error, Result};

fn invalid(msg: impl std::fmt::Display) -> Error {
    Error::Json(<serde_json::Error as serde::de::Error>::custom(msg))
}

fn ring_to_value(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

/// Standard GeoJSON MultiPolygon geometry object.
pub fn multipolygon_to_value(mp: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Value> = mp.0.iter()
        .map(|polygon| {
            let mut rings = vec![ring_to_value(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(ring_to_value));
            Value::Array(rings)
        })
        .collect();

    json!({ "type": "MultiPolygon", "coordinates": polygons })
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry object.
/// Extra coordinate dimensions are ignored.
pub fn geometry_from_value(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let coords = geometry["coordinates"].as_array()
        .ok_or_else(|| invalid("geometry has no coordinates array"))?;

    match geometry["type"].as_str() {
        Some("Polygon") => Ok(MultiPolygon::new(vec![parse_polygon_coords(coords)?])),
        Some("MultiPolygon") => coords.iter()
            .map(|polygon| polygon.as_array()
                .ok_or_else(|| invalid("MultiPolygon member is not an array"))
                .and_then(|rings| parse_polygon_coords(rings)))
            .collect::<Result<Vec<_>>>()
            .map(MultiPolygon::new),
        Some(other) => Err(invalid(format!("unsupported geometry type {other}"))),
        None => Err(invalid("geometry has no type")),
    }
}

/// Parse `[exterior, hole, hole, ...]`.
fn parse_polygon_coords(rings: &[Value]) -> Result<Polygon<f64>> {
    let mut parsed = rings.iter()
        .map(|ring| ring.as_array()
            .ok_or_else(|| invalid("ring is not an array"))
            .and_then(|coords| parse_ring_coords(coords)));

    let exterior = parsed.next()
        .ok_or_else(|| invalid("polygon is missing its exterior ring"))??;
    let interiors = parsed.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse `[[x, y], [x, y], ...]`, closing the ring if needed.
fn parse_ring_coords(coords: &[Value]) -> Result<LineString<f64>> {
    let mut points = coords.iter()
        .map(|pair| {
            let pair = pair.as_array().filter(|p| p.len() >= 2)
                .ok_or_else(|| invalid("coordinate must have at least two numbers"))?;
            let x = pair[0].as_f64().ok_or_else(|| invalid("x must be a number"))?;
            let y = pair[1].as_f64().ok_or_else(|| invalid("y must be a number"))?;
            Ok(Coord { x, y })
        })
        .collect::<Result<Vec<_>>>()?;

    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }
    Ok(LineString(points))
}

/// `#[serde(with = ...)]` adapter storing a MultiPolygon as a GeoJSON geometry object.
pub(crate) mod serde_multipolygon {
    use geo::MultiPolygon;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub(crate) fn serialize<S: Serializer>(mp: &MultiPolygon<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        super::multipolygon_to_value(mp).serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MultiPolygon<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::geometry_from_value(&value).map_err(serde::de::Error::custom)
    }
}
