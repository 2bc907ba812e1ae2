use std::borrow::Cow;

use geo::{BoundingRect, MapCoords, MultiPolygon};
use tracing::{debug, info};

use crate::common::new_id;
use crate::config::ConversionOptions;
use crate::crs::{reproject, Resolution, Transformer, WGS84};
use crate::dataset::{
    rect_array, Attributes, ConversionLog, Dataset, DatasetInfo, DatasetMetadata, Feature, RasterInfo, SourceKind,
};
use crate::error::{Error, Result};
use crate::geom::{is_effectively_empty, repair, simplify_preserving};
use crate::raster::polygonize::Polygonizer;
use crate::raster::Raster;
use crate::region::Region;

/// Turns a georeferenced grid into slope polygons in the canonical CRS.
#[derive(Debug, Clone, Copy)]
pub struct RasterVectorizer<'a> {
    region: &'a Region,
}

impl<'a> RasterVectorizer<'a> {
    pub fn new(region: &'a Region) -> Self { Self { region } }

    /// Source CRS of `raster`: a forced code goes through the resolver's
    /// lon/lat guard, a declared code is trusted, otherwise the grid centre is
    /// resolved heuristically.
    pub fn resolve_source_crs(&self, raster: &Raster, force_epsg: Option<u32>) -> Result<Resolution> {
        match (force_epsg, raster.epsg) {
            (Some(_), _) | (None, None) => self.region.resolver().resolve(raster.center(), force_epsg),
            (None, Some(epsg)) => {
                crate::crs::lookup(epsg)?;
                Ok(Resolution { epsg, note: format!("EPSG:{epsg} from GeoTIFF keys"), probed: Vec::new() })
            }
        }
    }

    /// Vectorize `raster`, optionally masked to `clip_boundary` (canonical CRS).
    ///
    /// Stops after `options.max_features` polygons; `metadata.truncated` says
    /// whether more regions were left.
    pub fn vectorize(
        &self,
        raster: &Raster,
        clip_boundary: Option<&MultiPolygon<f64>>,
        info: DatasetInfo,
        options: &ConversionOptions,
    ) -> Result<Dataset> {
        let resolution = self.resolve_source_crs(raster, options.force_epsg)?;
        let source_epsg = resolution.epsg;
        debug!("raster CRS: {}", resolution.note);

        let mut working: Cow<'_, Raster> = match clip_boundary {
            Some(boundary) => {
                let boundary_src = reproject(boundary, WGS84, source_epsg)?;
                Cow::Owned(raster.mask_to(&boundary_src)?)
            }
            None if raster.valid_count() == 0 => return Err(Error::NoValidData),
            None => Cow::Borrowed(raster),
        };
        if let Some(step) = options.quantize_step {
            working.to_mut().quantize(step);
        }
        let valid_cells = working.valid_count();
        info!(
            "vectorizing {}x{} window ({valid_cells} valid cells) from EPSG:{source_epsg}",
            working.width(), working.height()
        );

        let to_wgs84 = Transformer::to_wgs84(source_epsg)?;
        let transform = working.transform;
        let mut log = ConversionLog::default();
        let mut truncated = false;

        let regions = Polygonizer::new(&working.data, |v| working.is_valid(v));
        for (index, (value, pixel_shape)) in regions.enumerate() {
            if log.accepted.len() >= options.max_features {
                truncated = true;
                break;
            }

            let shape = pixel_shape.map_coords(|c| transform.pixel_to_geo(c.x, c.y));
            let shape = match to_wgs84.transform(&shape) {
                Ok(shape) => repair(&shape),
                Err(e) => {
                    log.skip(index, format!("reprojection failed: {e}"));
                    continue;
                }
            };
            if is_effectively_empty(&shape) {
                log.skip(index, "empty or invalid geometry");
                continue;
            }
            let shape = simplify_preserving(&shape, options.simplify_tolerance);

            let mut attributes = Attributes::slope(value);
            if options.add_region_tags {
                attributes.apply_tags(self.region.tag(&shape));
            }
            let id = log.accepted.len().to_string();
            log.accept(Feature::new(id, shape, attributes));
        }

        if truncated {
            info!("stopped at max_features = {}; more regions remain", options.max_features);
        }
        info!("vectorized {} polygon(s), skipped {}", log.accepted.len(), log.skipped.len());

        let mut metadata = DatasetMetadata::new(SourceKind::Raster, source_epsg, resolution.note);
        metadata.raster = Some(RasterInfo {
            width: working.width(),
            height: working.height(),
            bounds_src: rect_array(working.bounds()),
            bounds_wgs84: to_wgs84.transform(&working.bounds().to_polygon()).ok()
                .and_then(|polygon| polygon.bounding_rect())
                .map(rect_array),
            nodata: working.nodata,
            valid_cells,
        });
        metadata.max_features = Some(options.max_features);
        metadata.truncated = truncated;
        metadata.simplify_tolerance = options.simplify_tolerance;
        metadata.quantize_step = options.quantize_step;
        metadata.clipped = clip_boundary.is_some();
        metadata.region_tagging = options.add_region_tags;
        metadata.skipped = log.skipped;

        Ok(Dataset::new(new_id(), self.region.name(), info, log.accepted, metadata))
    }
}
