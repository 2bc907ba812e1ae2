use std::sync::LazyLock;

use geo::{Coord, MultiPolygon};
use regex::Regex;
use serde_json::{json, Value};
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use tracing::{debug, info, warn};

use crate::common::{new_id, shp_rings_to_geo};
use crate::config::ConversionOptions;
use crate::crs::{epsg_from_wkt, Resolution, Transformer, WGS84};
use crate::dataset::{
    AttrValue, Attributes, ConversionLog, Dataset, DatasetInfo, DatasetMetadata, Feature, SourceKind,
};
use crate::error::{Error, Result};
use crate::geom::geometry_from_value;
use crate::region::Region;
use crate::vector::pipeline::RecordPipeline;
use crate::vector::ShapefileBundle;

static CRS_NAME_EPSG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"EPSG:+(\d+)").expect("valid CRS name pattern")
});

/// Convert a shapefile record value to a scalar attribute.
fn field_to_attr(value: FieldValue) -> AttrValue {
    match value {
        FieldValue::Character(Some(s)) => AttrValue::Text(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => AttrValue::Number(n),
        FieldValue::Float(Some(f)) => AttrValue::Number(f64::from(f)),
        FieldValue::Logical(Some(b)) => AttrValue::Bool(b),
        FieldValue::Integer(i) => AttrValue::Number(f64::from(i)),
        FieldValue::Double(d) | FieldValue::Currency(d) => AttrValue::Number(d),
        FieldValue::Memo(s) => AttrValue::Text(s),
        FieldValue::Character(None) | FieldValue::Numeric(None)
            | FieldValue::Float(None) | FieldValue::Logical(None) => AttrValue::Null,
        other => AttrValue::Text(format!("{other:?}")),
    }
}

/// Convert a GeoJSON property value to a scalar attribute; nested values are kept as JSON text.
fn json_to_attr(value: &Value) -> AttrValue {
    match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(AttrValue::Null, AttrValue::Number),
        Value::String(s) => AttrValue::Text(s.clone()),
        other => AttrValue::Text(other.to_string()),
    }
}

/// Polygonal shapes as a MultiPolygon in the file's CRS; anything else is a skip reason.
fn shape_to_geo(shape: Shape) -> std::result::Result<MultiPolygon<f64>, String> {
    match shape {
        Shape::Polygon(p) => Ok(shp_rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonM(p) => Ok(shp_rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        Shape::PolygonZ(p) => Ok(shp_rings_to_geo(p.rings(), |pt| (pt.x, pt.y))),
        Shape::NullShape => Err("null shape".to_string()),
        other => Err(format!("unsupported shape type {:?}", other.shapetype())),
    }
}

/// First position of a GeoJSON coordinates array of any depth.
fn first_position(coordinates: &Value) -> Option<Coord<f64>> {
    let items = coordinates.as_array()?;
    match (items.first()?.as_f64(), items.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) => Some(Coord { x, y }),
        _ => items.iter().find_map(first_position),
    }
}

/// Converts vector uploads (shapefile bundles, GeoJSON collections) into datasets.
#[derive(Debug, Clone, Copy)]
pub struct VectorIngestor<'a> {
    region: &'a Region,
}

impl<'a> VectorIngestor<'a> {
    pub fn new(region: &'a Region) -> Self { Self { region } }

    /// Decide the source CRS from a declared code, an override and a sample vertex.
    fn source_crs(&self, declared: Option<(u32, String)>, sample: Option<Coord<f64>>, force_epsg: Option<u32>)
        -> Result<Resolution>
    {
        match (declared, force_epsg) {
            (Some((epsg, note)), None) => Ok(Resolution { epsg, note, probed: Vec::new() }),
            (_, force) => {
                // Nothing to look at means nothing to reproject.
                let Some(sample) = sample else {
                    return Ok(Resolution { epsg: WGS84, note: "Empty input; assumed EPSG:4326".to_string(), probed: Vec::new() });
                };
                self.region.resolver().resolve(sample, force)
            }
        }
    }

    fn tagger(&self, options: &ConversionOptions) -> Option<&'a Region> {
        options.add_region_tags.then_some(self.region)
    }

    /// Ingest a shapefile bundle, optionally clipped to `clip_boundary` (canonical CRS).
    ///
    /// Without a `.prj` the coordinates are taken as canonical lon/lat and
    /// passed through unchanged. Unreadable or unusable records are skipped
    /// and listed in `metadata.skipped`.
    pub fn ingest(
        &self,
        bundle: &ShapefileBundle,
        clip_boundary: Option<&MultiPolygon<f64>>,
        info: DatasetInfo,
        options: &ConversionOptions,
    ) -> Result<Dataset> {
        let wkt = bundle.projection_wkt()?;
        let mut reader = Reader::from_path(bundle.shp_path())
            .map_err(|e| Error::InvalidArchive(format!("failed to open {}: {e}", bundle.shp_path().display())))?;

        let mut log = ConversionLog::default();
        let mut shapes: Vec<(usize, MultiPolygon<f64>, Attributes)> = Vec::new();
        for (index, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = match result {
                Ok(item) => item,
                Err(e) => {
                    log.skip(index, format!("unreadable record: {e}"));
                    continue;
                }
            };
            match shape_to_geo(shape) {
                Ok(geometry) => {
                    let attributes = Attributes::from_fields(record.into_iter().map(|(name, value)| (name, field_to_attr(value))));
                    shapes.push((index, geometry, attributes));
                }
                Err(reason) => log.skip(index, reason),
            }
        }

        let declared = match &wkt {
            None => Some((WGS84, "No .prj; assumed EPSG:4326".to_string())),
            Some(wkt) => match epsg_from_wkt(wkt) {
                Some(epsg) => Some((epsg, format!("EPSG:{epsg} from .prj"))),
                None => {
                    warn!("unrecognized .prj; detecting CRS from coordinates");
                    None
                }
            },
        };
        let sample = shapes.first()
            .and_then(|(_, mp, _)| mp.0.first())
            .and_then(|polygon| polygon.exterior().0.first().copied());
        let resolution = self.source_crs(declared, sample, options.force_epsg)?;
        info!("shapefile {}: {} polygon record(s), {}", bundle.shp_path().display(), shapes.len(), resolution.note);

        let to_wgs84 = Transformer::to_wgs84(resolution.epsg)?;
        let pipeline = RecordPipeline::new(clip_boundary, options.simplify_tolerance, self.tagger(options));
        for (index, geometry, mut attributes) in shapes {
            let geometry = match to_wgs84.transform(&geometry) {
                Ok(geometry) => geometry,
                Err(e) => {
                    log.skip(index, format!("reprojection failed: {e}"));
                    continue;
                }
            };
            match pipeline.process(&geometry) {
                Ok((shape, tags)) => {
                    attributes.apply_tags(tags);
                    log.accept(Feature::new(index.to_string(), shape, attributes));
                }
                Err(reason) => log.skip(index, reason),
            }
        }

        Ok(self.finish(SourceKind::Shapefile, resolution, clip_boundary.is_some(), info, options, log))
    }

    /// Import an existing GeoJSON FeatureCollection, resolving its CRS from a
    /// `crs` member, an override or a sample coordinate. Elevation values in
    /// positions are carried through reprojection but dropped from the stored polygons.
    pub fn ingest_geojson(
        &self,
        collection: &Value,
        clip_boundary: Option<&MultiPolygon<f64>>,
        info: DatasetInfo,
        options: &ConversionOptions,
    ) -> Result<Dataset> {
        let features = collection["features"].as_array()
            .ok_or_else(|| Error::InvalidArchive("GeoJSON upload is not a FeatureCollection".to_string()))?;

        let declared = collection["crs"]["properties"]["name"].as_str()
            .and_then(|name| CRS_NAME_EPSG.captures(name))
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .map(|epsg| (epsg, format!("EPSG:{epsg} from crs member")));
        let sample = features.iter().find_map(|f| first_position(&f["geometry"]["coordinates"]));
        let resolution = self.source_crs(declared, sample, options.force_epsg)?;
        debug!("GeoJSON import: {} feature(s), {}", features.len(), resolution.note);

        let to_wgs84 = Transformer::to_wgs84(resolution.epsg)?;
        let pipeline = RecordPipeline::new(clip_boundary, options.simplify_tolerance, self.tagger(options));
        let mut log = ConversionLog::default();
        for (index, feature) in features.iter().enumerate() {
            let geometry = &feature["geometry"];
            let parsed = to_wgs84.transform_json(&geometry["coordinates"])
                .and_then(|coordinates| geometry_from_value(&json!({ "type": geometry["type"], "coordinates": coordinates })));
            let geometry = match parsed {
                Ok(geometry) => geometry,
                Err(e) => {
                    log.skip(index, format!("unusable geometry: {e}"));
                    continue;
                }
            };

            let mut attributes = Attributes::from_fields(feature["properties"].as_object().into_iter().flatten()
                .map(|(name, value)| (name.clone(), json_to_attr(value))));
            match pipeline.process(&geometry) {
                Ok((shape, tags)) => {
                    attributes.apply_tags(tags);
                    let id = match &feature["id"] {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => index.to_string(),
                    };
                    log.accept(Feature::new(id, shape, attributes));
                }
                Err(reason) => log.skip(index, reason),
            }
        }

        Ok(self.finish(SourceKind::Geojson, resolution, clip_boundary.is_some(), info, options, log))
    }

    fn finish(
        &self,
        source: SourceKind,
        resolution: Resolution,
        clipped: bool,
        info: DatasetInfo,
        options: &ConversionOptions,
        log: ConversionLog,
    ) -> Dataset {
        info!("ingested {} feature(s), skipped {}", log.accepted.len(), log.skipped.len());
        let mut metadata = DatasetMetadata::new(source, resolution.epsg, resolution.note);
        metadata.simplify_tolerance = options.simplify_tolerance;
        metadata.clipped = clipped;
        metadata.region_tagging = options.add_region_tags;
        metadata.skipped = log.skipped;
        Dataset::new(new_id(), self.region.name(), info, log.accepted, metadata)
    }
}
