use std::borrow::Cow;

use geo::{Area, BooleanOps, Centroid, CoordsIter, MultiPolygon, Rect};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::crs::{CrsResolver, Transformer, WGS84};
use crate::dataset::{rect_array, Attributes, Dataset, Feature};
use crate::error::Result;
use crate::extract::{ExtractionQuery, ValueStatistics};
use crate::geom::{merged_bounds, multipolygon_to_value, rect_envelope, rect_polygon, repair, ShapeIndex};

/// Intersections at or below this area are numerical noise.
const MIN_INTERSECTION_AREA: f64 = 1e-12;

/// Kilometres per degree near the equator, for a rough bbox area.
const KM_PER_DEGREE: f64 = 111.32;

/// A dataset feature as seen through a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFeature {
    /// Stable across repeated extractions of the same dataset.
    pub unique_id: String,
    pub feature_id: String,
    pub value: f64,
    pub intersection_area: f64,
    pub coverage_percentage: f64,
    pub centroid: Option<[f64; 2]>,
    pub geometry: MultiPolygon<f64>,
    /// None in "all" mode.
    pub intersection_geometry: Option<MultiPolygon<f64>>,
    pub properties: Attributes,
    pub district: Option<String>,
    pub sector: Option<String>,
    pub year: Option<i32>,
}

impl ExtractedFeature {
    pub fn to_json(&self) -> Value {
        json!({
            "unique_id": self.unique_id,
            "feature_id": self.feature_id,
            "value": self.value,
            "intersection_area": self.intersection_area,
            "coverage_percentage": self.coverage_percentage,
            "centroid_point": self.centroid.map(|[lon, lat]| json!({ "lon": lon, "lat": lat })),
            "geometry": multipolygon_to_value(&self.geometry),
            "intersection_geometry": self.intersection_geometry.as_ref().map(multipolygon_to_value),
            "original_properties": self.properties.to_properties(),
            "associated_district": self.district,
            "associated_sector": self.sector,
            "associated_year": self.year,
        })
    }
}

/// The rectangle a bbox query used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRegion {
    /// `[min_lon, min_lat, max_lon, max_lat]` after normalization.
    pub coordinates: [f64; 4],
    pub area_degrees_sq: f64,
    pub bbox_area_km2_approx: f64,
}

impl QueryRegion {
    fn new(rect: Rect<f64>) -> Self {
        let area = rect.unsigned_area();
        Self {
            coordinates: rect_array(rect),
            area_degrees_sq: area,
            bbox_area_km2_approx: area * KM_PER_DEGREE * KM_PER_DEGREE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub total_features: usize,
    pub total_coverage_area: f64,
    pub area_weighted_average_value: f64,
    /// Share of the query rectangle covered by features; None in "all" mode.
    pub coverage_percentage_of_query_region: Option<f64>,
    pub source_epsg: u32,
    pub crs_note: String,
}

/// Output of one extraction. Built fresh per call and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub upload_id: String,
    pub data_type: String,
    pub dataset_name: Option<String>,
    pub features: Vec<ExtractedFeature>,
    pub bounding_box_used: Option<QueryRegion>,
    pub summary: ExtractionSummary,
    pub statistics: Option<ValueStatistics>,
    /// `[min_lon, min_lat, max_lon, max_lat]` of the whole dataset.
    pub dataset_bounds: Option<[f64; 4]>,
}

impl ExtractionResult {
    #[inline] pub fn is_bbox(&self) -> bool { self.bounding_box_used.is_some() }

    pub fn to_json(&self) -> Value {
        json!({
            "upload_id": self.upload_id,
            "data_type": self.data_type,
            "dataset_name": self.dataset_name,
            "extraction_type": if self.is_bbox() { "bbox" } else { "all" },
            "features": self.features.iter().map(ExtractedFeature::to_json).collect::<Vec<_>>(),
            "bounding_box": self.bounding_box_used,
            "summary": self.summary,
            "statistics": self.statistics,
            "dataset_bounds": self.dataset_bounds,
        })
    }
}

/// Runs extraction queries against datasets. Stateless apart from the
/// resolver used for datasets stored outside EPSG:4326.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionEngine<'a> {
    resolver: &'a CrsResolver,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(resolver: &'a CrsResolver) -> Self { Self { resolver } }

    /// Select, measure and aggregate the features of `dataset` for `query`.
    /// Either the whole query succeeds, possibly with no features, or it
    /// fails before any feature is measured.
    pub fn extract(&self, dataset: &Dataset, query: &ExtractionQuery) -> Result<ExtractionResult> {
        let window = query.window()?;
        let (features, source_epsg, crs_note) = self.canonical_features(dataset, query)?;

        let dataset_bounds = merged_bounds(features.iter().map(|f| &f.geometry)).map(rect_array);
        let unique_id = |feature: &Feature| format!("{}_{}", dataset.upload_id, feature.id);

        let mut extracted = Vec::new();
        match window {
            None => {
                for feature in features.iter() {
                    let area = feature.geometry.unsigned_area();
                    extracted.push(self.describe(unique_id(feature), feature, area, 100.0, None, query));
                }
            }
            Some(rect) => {
                let index = ShapeIndex::new(features.iter().map(|f| &f.geometry));
                let envelope = rect_envelope(&rect);
                let clip = rect_polygon(&rect);
                let candidates = index.candidates(&envelope);
                debug!("bbox {:?}: {} of {} features pass the envelope test", rect_array(rect), candidates.len(), features.len());

                for i in candidates {
                    let feature = &features[i];
                    let intersection = feature.geometry.intersection(&clip);
                    let area = feature.geometry.unsigned_area();
                    let overlap = intersection.unsigned_area().min(area);
                    if overlap <= MIN_INTERSECTION_AREA {
                        continue;
                    }
                    let coverage = if area > 0.0 { (overlap / area * 100.0).clamp(0.0, 100.0) } else { 0.0 };
                    extracted.push(self.describe(unique_id(feature), feature, overlap, coverage, Some(intersection), query));
                }
            }
        }

        let total_coverage_area: f64 = extracted.iter().map(|f| f.intersection_area).sum();
        let area_weighted_average_value = if total_coverage_area > 0.0 {
            extracted.iter().map(|f| f.value * f.intersection_area).sum::<f64>() / total_coverage_area
        } else {
            0.0
        };
        let bounding_box_used = window.map(QueryRegion::new);
        let coverage_percentage_of_query_region = bounding_box_used.as_ref().map(|region| {
            if region.area_degrees_sq > 0.0 { total_coverage_area / region.area_degrees_sq * 100.0 } else { 0.0 }
        });
        let statistics = ValueStatistics::from_pairs(extracted.iter().map(|f| (f.value, f.intersection_area)));

        info!(
            "extracted {} of {} features from {} ({})",
            extracted.len(), dataset.len(), dataset.upload_id,
            if window.is_some() { "bbox" } else { "all" },
        );

        Ok(ExtractionResult {
            upload_id: dataset.upload_id.clone(),
            data_type: dataset.data_type.clone(),
            dataset_name: dataset.name.clone(),
            summary: ExtractionSummary {
                total_features: extracted.len(),
                total_coverage_area,
                area_weighted_average_value,
                coverage_percentage_of_query_region,
                source_epsg,
                crs_note,
            },
            features: extracted,
            bounding_box_used,
            statistics,
            dataset_bounds,
        })
    }

    /// Features in EPSG:4326. Datasets already canonical are borrowed as-is;
    /// others are reprojected from their recorded CRS or the query's override.
    fn canonical_features<'d>(&self, dataset: &'d Dataset, query: &ExtractionQuery) -> Result<(Cow<'d, [Feature]>, u32, String)> {
        let meta = &dataset.metadata;
        if meta.crs_epsg == WGS84 {
            return Ok((Cow::Borrowed(&dataset.features), WGS84, "Dataset stored in EPSG:4326".to_string()));
        }

        let requested = query.source_epsg.unwrap_or(meta.crs_epsg);
        let sample = dataset.features.iter().find_map(|f| f.geometry.coords_iter().next());
        let (epsg, note) = match sample {
            Some(sample) => {
                let resolution = self.resolver.resolve(sample, Some(requested))?;
                (resolution.epsg, resolution.note)
            }
            None => (requested, format!("Forced EPSG:{requested}")),
        };
        debug!("reprojecting {} features of {} from EPSG:{epsg}", dataset.len(), dataset.upload_id);

        let transformer = Transformer::to_wgs84(epsg)?;
        let features = dataset.features.iter()
            .map(|f| Ok(Feature::new(f.id.clone(), repair(&transformer.transform(&f.geometry)?), f.attributes.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok((Cow::Owned(features), epsg, note))
    }

    fn describe(
        &self,
        unique_id: String,
        feature: &Feature,
        intersection_area: f64,
        coverage_percentage: f64,
        intersection_geometry: Option<MultiPolygon<f64>>,
        query: &ExtractionQuery,
    ) -> ExtractedFeature {
        ExtractedFeature {
            unique_id,
            feature_id: feature.id.clone(),
            value: feature.attributes.value().unwrap_or(0.0),
            intersection_area,
            coverage_percentage,
            centroid: feature.geometry.centroid().map(|p| [p.x(), p.y()]),
            geometry: feature.geometry.clone(),
            intersection_geometry,
            properties: feature.attributes.clone(),
            district: query.district.clone(),
            sector: query.sector.clone(),
            year: query.year,
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::config::RegionConfig;
    use crate::dataset::{AttrValue, DatasetInfo, DatasetMetadata, SourceKind};
    use crate::error::Error;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
        ]])
    }

    fn dataset(features: Vec<Feature>) -> Dataset {
        let metadata = DatasetMetadata::new(SourceKind::Geojson, WGS84, "Assumed EPSG:4326");
        let info = DatasetInfo { data_type: "slope".to_string(), ..DatasetInfo::default() };
        Dataset::new("u1".to_string(), "rwanda", info, features, metadata)
    }

    fn resolver() -> CrsResolver { CrsResolver::new(&RegionConfig::default()) }

    #[test]
    fn quarter_of_a_square() {
        let resolver = resolver();
        let data = dataset(vec![Feature::new("0", square(0.0, 0.0, 2.0), Attributes::slope(12.0))]);
        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::bbox(0.0, 0.0, 1.0, 1.0)).unwrap();

        assert_eq!(result.features.len(), 1);
        let feature = &result.features[0];
        assert!((feature.intersection_area - 1.0).abs() < 1e-9);
        assert!((feature.coverage_percentage - 25.0).abs() < 1e-9);
        assert_eq!(feature.value, 12.0);
        assert_eq!(feature.unique_id, "u1_0");

        assert!((result.summary.total_coverage_area - 1.0).abs() < 1e-9);
        assert!((result.summary.area_weighted_average_value - 12.0).abs() < 1e-9);
        assert!((result.summary.coverage_percentage_of_query_region.unwrap() - 100.0).abs() < 1e-9);
        let region = result.bounding_box_used.unwrap();
        assert_eq!(region.coordinates, [0.0, 0.0, 1.0, 1.0]);
        assert!((region.bbox_area_km2_approx - 111.32 * 111.32).abs() < 1e-6);
        assert_eq!(result.dataset_bounds, Some([0.0, 0.0, 2.0, 2.0]));
    }

    #[test]
    fn all_mode_is_full_coverage() {
        let resolver = resolver();
        let data = dataset(vec![
            Feature::new("0", square(0.0, 0.0, 1.0), Attributes::slope(10.0)),
            Feature::new("1", square(5.0, 5.0, 2.0), Attributes::slope(20.0)),
        ]);
        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::all()).unwrap();

        assert_eq!(result.summary.total_features, 2);
        for (feature, source) in result.features.iter().zip(&data.features) {
            assert_eq!(feature.coverage_percentage, 100.0);
            assert_eq!(feature.intersection_area, source.geometry.unsigned_area());
            assert!(feature.intersection_geometry.is_none());
        }
        assert_eq!(result.summary.coverage_percentage_of_query_region, None);
        assert!((result.summary.area_weighted_average_value - 18.0).abs() < 1e-9);
        assert_eq!(result.statistics.unwrap().median, 15.0);
    }

    #[test]
    fn edge_contact_is_noise() {
        let resolver = resolver();
        let data = dataset(vec![Feature::new("0", square(1.0, 0.0, 1.0), Attributes::slope(1.0))]);
        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::bbox(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert!(result.features.is_empty());
        assert_eq!(result.summary.total_coverage_area, 0.0);
        assert_eq!(result.summary.area_weighted_average_value, 0.0);
        assert_eq!(result.statistics, None);
        assert_eq!(result.dataset_bounds, Some([1.0, 0.0, 2.0, 1.0]));
    }

    #[test]
    fn degenerate_box_yields_empty_result() {
        let resolver = resolver();
        let data = dataset(vec![Feature::new("0", square(0.0, 0.0, 2.0), Attributes::slope(1.0))]);
        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::bbox(1.0, 1.0, 1.0, 1.0)).unwrap();
        assert!(result.features.is_empty());
        assert_eq!(result.summary.coverage_percentage_of_query_region, Some(0.0));
    }

    #[test]
    fn invalid_box_fails_up_front() {
        let resolver = resolver();
        let data = dataset(vec![]);
        let err = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::bbox(f64::NAN, 0.0, 1.0, 1.0));
        assert!(matches!(err, Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn value_falls_back_to_value_field() {
        let resolver = resolver();
        let attrs = Attributes::from_fields([("value".to_string(), AttrValue::Number(7.5))]);
        let data = dataset(vec![
            Feature::new("0", square(0.0, 0.0, 1.0), attrs),
            Feature::new("1", square(0.0, 0.0, 1.0), Attributes::default()),
        ]);
        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::all()).unwrap();
        assert_eq!(result.features[0].value, 7.5);
        assert_eq!(result.features[1].value, 0.0);
    }

    #[test]
    fn projected_dataset_is_reprojected() {
        let resolver = resolver();
        let to_utm = Transformer::from_wgs84(32736).unwrap();
        let lonlat = square(30.05, -1.96, 0.02);
        let mut data = dataset(vec![Feature::new("0", to_utm.transform(&lonlat).unwrap(), Attributes::slope(3.0))]);
        data.metadata.crs_epsg = 32736;

        let result = ExtractionEngine::new(&resolver).extract(&data, &ExtractionQuery::bbox(30.0, -2.0, 30.1, -1.9)).unwrap();
        assert_eq!(result.summary.source_epsg, 32736);
        assert_eq!(result.features.len(), 1);
        let [lon, lat] = result.features[0].centroid.unwrap();
        assert!((lon - 30.06).abs() < 1e-6 && (lat + 1.95).abs() < 1e-6);
        assert!((result.features[0].coverage_percentage - 100.0).abs() < 1e-6);
    }

    #[test]
    fn labels_are_copied_to_features() {
        let resolver = resolver();
        let data = dataset(vec![Feature::new("0", square(0.0, 0.0, 1.0), Attributes::slope(1.0))]);
        let query = ExtractionQuery::all().with_labels(Some("Gasabo".into()), Some("Remera".into()), Some(2024));
        let result = ExtractionEngine::new(&resolver).extract(&data, &query).unwrap();
        let json = result.to_json();
        assert_eq!(json["extraction_type"], "all");
        assert_eq!(json["features"][0]["associated_district"], "Gasabo");
        assert_eq!(json["features"][0]["associated_year"], 2024);
    }
}
