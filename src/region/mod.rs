//! The target region: its configuration, outline used for clipping and the
//! district/sector indices used for tagging.
mod boundary;
mod index;

use geo::{Centroid, MultiPolygon};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ConversionOptions, RegionConfig};
use crate::crs::CrsResolver;
use crate::error::Result;
use crate::geom::rect_polygon;

pub use boundary::{boundaries_from_geojson, read_boundaries, union_all, BoundaryEntry};
pub(crate) use boundary::property_str;
pub use index::RegionIndex;

/// Administrative tags derived from a feature's centroid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionTags {
    pub district: Option<String>,
    pub sector: Option<String>,
}

/// Everything the converters need to know about the target region.
#[derive(Debug, Clone)]
pub struct Region {
    config: RegionConfig,
    resolver: CrsResolver,
    outline: MultiPolygon<f64>,
    precise_outline: bool,
    districts: Option<RegionIndex>,
    sectors: Option<RegionIndex>,
}

impl Region {
    /// Load the boundary files named in `config`.
    /// Without a boundary file the outline is the loose bounding rectangle.
    pub fn load(config: RegionConfig) -> Result<Self> {
        let outline = match &config.boundary_path {
            Some(path) => {
                let entries = read_boundaries(path, &config.district_name_field)?;
                info!("loaded {} region boundary polygon(s) from {}", entries.len(), path.display());
                Some(union_all(&entries)).filter(|mp| !mp.0.is_empty())
            }
            None => None,
        };
        if config.boundary_path.is_some() && outline.is_none() {
            warn!("region boundary file has no polygons; falling back to the bounding box");
        }

        let districts = config.districts_path.as_deref()
            .map(|path| read_boundaries(path, &config.district_name_field).map(RegionIndex::build))
            .transpose()?;
        let sectors = config.sectors_path.as_deref()
            .map(|path| read_boundaries(path, &config.sector_name_field).map(RegionIndex::build))
            .transpose()?;

        Ok(Self::from_parts(config, outline, districts, sectors))
    }

    /// Assemble a region from already-loaded parts.
    pub fn from_parts(
        config: RegionConfig,
        outline: Option<MultiPolygon<f64>>,
        districts: Option<RegionIndex>,
        sectors: Option<RegionIndex>,
    ) -> Self {
        let precise_outline = outline.is_some();
        let outline = outline.unwrap_or_else(|| rect_polygon(&config.bounds.to_rect()));
        Self { resolver: CrsResolver::new(&config), config, outline, precise_outline, districts, sectors }
    }

    #[inline] pub fn config(&self) -> &RegionConfig { &self.config }

    #[inline] pub fn name(&self) -> &str { &self.config.name }

    #[inline] pub fn resolver(&self) -> &CrsResolver { &self.resolver }

    /// Clip outline in the canonical CRS: the boundary union, or the loose bbox.
    #[inline] pub fn outline(&self) -> &MultiPolygon<f64> { &self.outline }

    /// False when the outline is only the loose bounding rectangle.
    #[inline] pub fn has_precise_outline(&self) -> bool { self.precise_outline }

    /// The outline when `options` ask for clipping.
    pub fn clip_boundary(&self, options: &ConversionOptions) -> Option<&MultiPolygon<f64>> {
        options.clip_to_region.then_some(&self.outline)
    }

    /// True when at least one tagging index is loaded.
    pub fn can_tag(&self) -> bool {
        self.districts.is_some() || self.sectors.is_some()
    }

    /// Tag a geometry with the district/sector containing its centroid.
    pub fn tag(&self, geometry: &MultiPolygon<f64>) -> RegionTags {
        let Some(centroid) = geometry.centroid() else { return RegionTags::default() };
        let lookup = |index: &Option<RegionIndex>| index.as_ref()
            .and_then(|index| index.lookup(centroid))
            .map(str::to_string);
        RegionTags { district: lookup(&self.districts), sector: lookup(&self.sectors) }
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area};
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_boundary_falls_back_to_bbox() {
        let region = Region::from_parts(RegionConfig::default(), None, None, None);
        assert!(!region.has_precise_outline());
        assert!((region.outline().unsigned_area() - 2.4 * 2.3).abs() < 1e-9);
        assert!(!region.can_tag());
    }

    #[test]
    fn tags_use_the_centroid() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "DISTRICT": "Nyarugenge" },
                "geometry": { "type": "Polygon", "coordinates": [[[30.0, -2.0], [30.1, -2.0], [30.1, -1.9], [30.0, -1.9], [30.0, -2.0]]] }
            }]
        });
        let districts = RegionIndex::build(boundaries_from_geojson(&collection, "district").unwrap());
        let region = Region::from_parts(RegionConfig::default(), None, Some(districts), None);

        let inside = MultiPolygon::new(vec![polygon![
            (x: 30.02, y: -1.98), (x: 30.04, y: -1.98), (x: 30.04, y: -1.96), (x: 30.02, y: -1.98),
        ]]);
        let tags = region.tag(&inside);
        assert_eq!(tags.district.as_deref(), Some("Nyarugenge"));
        assert_eq!(tags.sector, None);
    }
}
