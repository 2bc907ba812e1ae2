use geo::Coord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{LonLatBounds, RegionConfig};
use crate::crs::registry::{self, WGS84};
use crate::crs::Transformer;
use crate::error::{Error, Result};

/// One way of interpreting a sample coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Read the coordinate as lon/lat degrees.
    Geodetic,
    /// Read the coordinate as easting/northing in the given projected CRS.
    Projected(u32),
}

/// Outcome of CRS resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub epsg: u32,
    pub note: String,
    /// Projected candidates that were tried before a match, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probed: Vec<u32>,
}

impl Resolution {
    fn new(epsg: u32, note: String) -> Self {
        Self { epsg, note, probed: Vec::new() }
    }
}

/// Heuristic CRS detection for one region: a strategy table evaluated in order,
/// first match wins.
#[derive(Debug, Clone)]
pub struct CrsResolver {
    region: String,
    bounds: LonLatBounds,
    strategies: Vec<Strategy>,
    strict_ambiguity: bool,
}

#[inline]
fn looks_like_degrees(p: Coord<f64>) -> bool {
    (-180.0..=180.0).contains(&p.x) && (-90.0..=90.0).contains(&p.y)
}

impl CrsResolver {
    pub fn new(config: &RegionConfig) -> Self {
        let strategies = std::iter::once(Strategy::Geodetic)
            .chain(config.candidate_epsgs.iter().copied()
                .filter(|&epsg| epsg != WGS84)
                .map(Strategy::Projected))
            .collect();

        Self {
            region: config.name.clone(),
            bounds: config.bounds,
            strategies,
            strict_ambiguity: config.strict_ambiguity,
        }
    }

    /// The ordered strategy table.
    #[inline] pub fn strategies(&self) -> &[Strategy] { &self.strategies }

    #[inline] pub fn bounds(&self) -> &LonLatBounds { &self.bounds }

    fn geodetic_in_region(&self, p: Coord<f64>) -> bool {
        looks_like_degrees(p) && self.bounds.contains(p.x, p.y)
    }

    /// Does reading `p` in `epsg` put it inside the region?
    fn projected_in_region(&self, epsg: u32, p: Coord<f64>) -> bool {
        match Transformer::to_wgs84(epsg).and_then(|t| t.transform_xy(p.x, p.y)) {
            Ok((lon, lat)) => self.bounds.contains(lon, lat),
            Err(e) => {
                debug!("EPSG:{epsg} rejected for ({}, {}): {e}", p.x, p.y);
                false
            }
        }
    }

    fn projected_candidates(&self) -> impl Iterator<Item = u32> + '_ {
        self.strategies.iter().filter_map(|s| match s {
            Strategy::Projected(epsg) => Some(*epsg),
            Strategy::Geodetic => None,
        })
    }

    /// Determine the CRS of `sample`.
    ///
    /// An override is honored unless the sample already reads as lon/lat inside
    /// the region, in which case degrees win and the note says so. Without an
    /// override, the geodetic reading is tried first and then each projected
    /// candidate in order.
    pub fn resolve(&self, sample: Coord<f64>, override_epsg: Option<u32>) -> Result<Resolution> {
        if let Some(forced) = override_epsg {
            if forced != WGS84 && self.geodetic_in_region(sample) {
                let note = format!("Ignored override EPSG:{forced}; looks like lon/lat in {}", self.region);
                warn!("{note}");
                return Ok(Resolution::new(WGS84, note));
            }
            registry::lookup(forced)?;
            return Ok(Resolution::new(forced, format!("Forced EPSG:{forced}")));
        }

        let mut probed = Vec::new();
        for strategy in &self.strategies {
            match *strategy {
                Strategy::Geodetic => {
                    if !self.geodetic_in_region(sample) { continue; }
                    if self.strict_ambiguity {
                        if let Some(other) = self.projected_candidates().find(|&epsg| self.projected_in_region(epsg, sample)) {
                            warn!("sample ({}, {}) is plausible as EPSG:4326 and EPSG:{other}", sample.x, sample.y);
                            return Err(Error::CrsUndetermined { x: sample.x, y: sample.y });
                        }
                    }
                    return Ok(Resolution { probed, ..Resolution::new(WGS84, "Assumed EPSG:4326".to_string()) });
                }
                Strategy::Projected(epsg) => {
                    probed.push(epsg);
                    if self.projected_in_region(epsg, sample) {
                        debug!("sample ({}, {}) resolved to EPSG:{epsg}", sample.x, sample.y);
                        return Ok(Resolution { probed, ..Resolution::new(epsg, format!("Auto-detected EPSG:{epsg}")) });
                    }
                }
            }
        }

        Err(Error::CrsUndetermined { x: sample.x, y: sample.y })
    }
}
