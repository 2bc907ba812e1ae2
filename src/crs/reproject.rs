use geo::{Coord, MapCoords};
use proj4rs::{proj::Proj as Proj4, transform::transform};
use serde_json::Value;

use crate::crs::registry::{self, CrsDef, WGS84};
use crate::error::{Error, Result};

/// A prepared source -> target coordinate transform.
/// Building the PROJ.4 pair once and reusing it keeps per-vertex cost low.
pub struct Transformer {
    source: CrsDef,
    target: CrsDef,
    /// None when source and target are the same CRS.
    projs: Option<(Proj4, Proj4)>,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("source", &self.source.epsg)
            .field("target", &self.target.epsg)
            .finish()
    }
}

fn build_proj(def: &CrsDef) -> Result<Proj4> {
    Proj4::from_proj_string(&def.proj4)
        .map_err(|e| Error::Projection(format!("failed to build PROJ.4 for EPSG:{}: {e}", def.epsg)))
}

impl Transformer {
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = registry::lookup(source_epsg)?;
        let target = registry::lookup(target_epsg)?;
        let projs = if source_epsg == target_epsg { None }
            else { Some((build_proj(&source)?, build_proj(&target)?)) };
        Ok(Self { source, target, projs })
    }

    /// Transform from `source_epsg` into the canonical CRS.
    pub fn to_wgs84(source_epsg: u32) -> Result<Self> { Self::new(source_epsg, WGS84) }

    /// Transform from the canonical CRS into `target_epsg`.
    pub fn from_wgs84(target_epsg: u32) -> Result<Self> { Self::new(WGS84, target_epsg) }

    #[inline] pub fn source_epsg(&self) -> u32 { self.source.epsg }

    #[inline] pub fn target_epsg(&self) -> u32 { self.target.epsg }

    #[inline] pub fn is_identity(&self) -> bool { self.projs.is_none() }

    /// Transform one coordinate pair. Geographic axes are in degrees on both ends.
    pub fn transform_xy(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some((from, to)) = &self.projs else { return Ok((x, y)) };

        let mut point = if self.source.geographic { (x.to_radians(), y.to_radians(), 0.0) }
            else { (x, y, 0.0) };
        transform(from, to, &mut point)
            .map_err(|e| Error::Projection(format!(
                "EPSG:{} -> EPSG:{} failed at ({x}, {y}): {e}", self.source.epsg, self.target.epsg)))?;

        let (tx, ty) = if self.target.geographic { (point.0.to_degrees(), point.1.to_degrees()) }
            else { (point.0, point.1) };
        if !tx.is_finite() || !ty.is_finite() {
            return Err(Error::Projection(format!(
                "EPSG:{} -> EPSG:{} produced a non-finite result at ({x}, {y})", self.source.epsg, self.target.epsg)));
        }
        Ok((tx, ty))
    }

    #[inline]
    fn transform_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        self.transform_xy(coord.x, coord.y).map(|(x, y)| Coord { x, y })
    }

    /// Transform any `geo` geometry, returning a new one.
    pub fn transform<G>(&self, geometry: &G) -> Result<G>
    where
        G: MapCoords<f64, f64, Output = G> + Clone,
    {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_coords(|coord| self.transform_coord(coord))
    }

    /// Transform raw GeoJSON `coordinates` of any nesting depth
    /// (point, line, polygon, multipolygon). Positions keep any elevation or
    /// extra values after x and y untouched.
    pub fn transform_json(&self, coordinates: &Value) -> Result<Value> {
        let Value::Array(items) = coordinates else {
            return Err(Error::Projection(format!("coordinates must be arrays, got {coordinates}")));
        };

        if items.first().is_some_and(Value::is_number) {
            let (x, y) = match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(Error::Projection(format!("position needs two numbers, got {coordinates}"))),
            };
            let (tx, ty) = self.transform_xy(x, y)?;
            let mut position = vec![Value::from(tx), Value::from(ty)];
            position.extend(items.iter().skip(2).cloned());
            return Ok(Value::Array(position));
        }

        items.iter()
            .map(|item| self.transform_json(item))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }
}

/// Reproject `geometry` from `source_epsg` to `target_epsg`; a no-op clone when they match.
pub fn reproject<G>(geometry: &G, source_epsg: u32, target_epsg: u32) -> Result<G>
where
    G: MapCoords<f64, f64, Output = G> + Clone,
{
    if source_epsg == target_epsg {
        return Ok(geometry.clone());
    }
    Transformer::new(source_epsg, target_epsg)?.transform(geometry)
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use serde_json::json;

    use super::*;

    #[test]
    fn same_crs_is_identity() {
        let t = Transformer::new(32736, 32736).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform_xy(171_000.5, 9_784_000.25).unwrap(), (171_000.5, 9_784_000.25));
    }

    #[test]
    fn utm_36s_origin_maps_to_central_meridian() {
        // False easting/northing of UTM 36S sit on lon 33, the equator.
        let t = Transformer::to_wgs84(32736).unwrap();
        let (lon, lat) = t.transform_xy(500_000.0, 10_000_000.0).unwrap();
        assert!((lon - 33.0).abs() < 1e-6, "lon = {lon}");
        assert!(lat.abs() < 1e-6, "lat = {lat}");
    }

    #[test]
    fn json_positions_keep_elevation() {
        let t = Transformer::from_wgs84(32736).unwrap();
        let coords = json!([[[30.0, -2.0, 1534.0], [30.1, -2.0, 1540.5], [30.1, -1.9, 1550.0], [30.0, -2.0, 1534.0]]]);
        let out = t.transform_json(&coords).unwrap();
        let ring = out[0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[1][2], json!(1540.5));
        assert!(ring[0][0].as_f64().unwrap() > 100_000.0);
    }

    #[test]
    fn reproject_round_trips_a_polygon() {
        let mp = MultiPolygon::new(vec![polygon![
            (x: 30.0, y: -2.0), (x: 30.2, y: -2.0), (x: 30.2, y: -1.8), (x: 30.0, y: -2.0),
        ]]);
        let there = reproject(&mp, WGS84, 32735).unwrap();
        let back = reproject(&there, 32735, WGS84).unwrap();
        for (a, b) in mp.0[0].exterior().coords().zip(back.0[0].exterior().coords()) {
            assert!((a.x - b.x).abs() < 1e-7 && (a.y - b.y).abs() < 1e-7);
        }
    }
}
