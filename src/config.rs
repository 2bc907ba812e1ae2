use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default serialized-size ceiling, just under a 16 MB document limit.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 15 * 1024 * 1024;

/// Axis-aligned lon/lat box, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLatBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl LonLatBounds {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self { min_lon, min_lat, max_lon, max_lat }
    }

    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Bounds as a `geo::Rect`.
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }
}

/// Everything region-specific: where the region is, which projections its
/// data tends to arrive in, and where its administrative boundaries live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub name: String,
    /// Loose bounding box used both for CRS plausibility and as the fallback clip.
    pub bounds: LonLatBounds,
    /// Projected CRS candidates, probed in order after the geodetic check.
    pub candidate_epsgs: Vec<u32>,
    pub boundary_path: Option<PathBuf>,
    pub districts_path: Option<PathBuf>,
    pub sectors_path: Option<PathBuf>,
    pub district_name_field: String,
    pub sector_name_field: String,
    /// Fail instead of preferring degrees when a projected reading is also plausible.
    pub strict_ambiguity: bool,
    pub max_document_bytes: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: "rwanda".to_string(),
            bounds: LonLatBounds::new(28.6, -3.1, 31.0, -0.8),
            candidate_epsgs: vec![32735, 32736, 20935, 20936, 21035, 21036],
            boundary_path: None,
            districts_path: None,
            sectors_path: None,
            district_name_field: "district".to_string(),
            sector_name_field: "sector".to_string(),
            strict_ambiguity: false,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl RegionConfig {
    /// Load a region config from a JSON file; missing keys take Rwanda defaults.
    /// Relative boundary paths are resolved against the config file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut config: RegionConfig = serde_json::from_slice(&bytes)?;
        if let Some(base) = path.parent() {
            for p in [&mut config.boundary_path, &mut config.districts_path, &mut config.sectors_path] {
                if let Some(joined) = p.as_ref().filter(|p| p.is_relative()).map(|rel| base.join(rel)) {
                    *p = Some(joined);
                }
            }
        }
        Ok(config)
    }
}

/// Caller-tunable parameters shared by the raster and vector converters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Simplification tolerance in degrees of the canonical CRS.
    pub simplify_tolerance: f64,
    pub max_features: usize,
    pub force_epsg: Option<u32>,
    pub clip_to_region: bool,
    pub quantize_step: Option<f64>,
    pub add_region_tags: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            simplify_tolerance: 0.002,
            max_features: 8000,
            force_epsg: None,
            clip_to_region: true,
            quantize_step: None,
            add_region_tags: false,
        }
    }
}
