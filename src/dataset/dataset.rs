use std::collections::BTreeMap;

use geo::Rect;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::crs::WGS84;
use crate::dataset::Feature;
use crate::geom::merged_bounds;

/// Where a dataset's features came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind { Raster, Shapefile, Geojson }

/// Caller-supplied labels for a new dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub data_type: String,
    pub year: Option<i32>,
    pub name: Option<String>,
}

/// An input record or polygon that did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Raster facts recorded when a dataset came from a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    /// `[min_x, min_y, max_x, max_y]` of the processed window in the source CRS.
    pub bounds_src: [f64; 4],
    /// The same window in the canonical CRS.
    #[serde(default)]
    pub bounds_wgs84: Option<[f64; 4]>,
    pub nodata: Option<f64>,
    pub valid_cells: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub source: SourceKind,
    /// CRS of the input before reprojection.
    pub source_epsg: u32,
    /// CRS of the stored features; the canonical CRS for everything this crate writes.
    #[serde(default = "default_crs")]
    pub crs_epsg: u32,
    pub crs_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster: Option<RasterInfo>,
    /// `[min_lon, min_lat, max_lon, max_lat]` of all features.
    pub bounds: Option<[f64; 4]>,
    pub total_features: usize,
    pub max_features: Option<usize>,
    pub truncated: bool,
    pub simplify_tolerance: f64,
    pub quantize_step: Option<f64>,
    pub clipped: bool,
    pub region_tagging: bool,
    #[serde(default)]
    pub skipped: Vec<SkippedRecord>,
    #[serde(default)]
    pub created_unix: u64,
}

fn default_crs() -> u32 { WGS84 }

impl DatasetMetadata {
    /// Metadata with everything but the source unset.
    pub fn new(source: SourceKind, source_epsg: u32, crs_note: impl Into<String>) -> Self {
        Self {
            source,
            source_epsg,
            crs_epsg: WGS84,
            crs_note: crs_note.into(),
            raster: None,
            bounds: None,
            total_features: 0,
            max_features: None,
            truncated: false,
            simplify_tolerance: 0.0,
            quantize_step: None,
            clipped: false,
            region_tagging: false,
            skipped: Vec::new(),
            created_unix: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }

    /// Skip counts grouped by reason.
    pub fn skip_summary(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.skipped {
            *counts.entry(record.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// A converted feature collection with its provenance.
/// Never partially updated; re-uploads replace the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub upload_id: String,
    pub region: String,
    pub data_type: String,
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub features: Vec<Feature>,
    pub metadata: DatasetMetadata,
}

/// Short description of a stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetHeader {
    pub upload_id: String,
    pub region: String,
    pub data_type: String,
    pub year: Option<i32>,
    pub name: Option<String>,
    pub total_features: usize,
    pub truncated: bool,
}

impl Dataset {
    /// Assemble a dataset, filling in the feature count and bounds.
    pub fn new(
        upload_id: String,
        region: &str,
        info: DatasetInfo,
        features: Vec<Feature>,
        mut metadata: DatasetMetadata,
    ) -> Self {
        metadata.total_features = features.len();
        metadata.bounds = merged_bounds(features.iter().map(|f| &f.geometry)).map(rect_array);
        Self {
            upload_id,
            region: region.to_string(),
            data_type: info.data_type,
            year: info.year,
            name: info.name,
            features,
            metadata,
        }
    }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    pub fn header(&self) -> DatasetHeader {
        DatasetHeader {
            upload_id: self.upload_id.clone(),
            region: self.region.clone(),
            data_type: self.data_type.clone(),
            year: self.year,
            name: self.name.clone(),
            total_features: self.features.len(),
            truncated: self.metadata.truncated,
        }
    }

    /// The features as a GeoJSON FeatureCollection, with metadata as a foreign member.
    pub fn to_feature_collection(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
            "metadata": self.metadata,
        })
    }
}

/// `[min_x, min_y, max_x, max_y]`.
#[inline]
pub(crate) fn rect_array(rect: Rect<f64>) -> [f64; 4] {
    [rect.min().x, rect.min().y, rect.max().x, rect.max().y]
}

/// Collects accepted features and skipped inputs during one conversion.
#[derive(Debug, Default)]
pub struct ConversionLog {
    pub accepted: Vec<Feature>,
    pub skipped: Vec<SkippedRecord>,
}

impl ConversionLog {
    #[inline] pub fn accept(&mut self, feature: Feature) { self.accepted.push(feature) }

    #[inline]
    pub fn skip(&mut self, index: usize, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord { index, reason: reason.into() })
    }
}
