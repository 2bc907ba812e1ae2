use geo::{coord, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which features a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Selector {
    /// Every feature, counted at full coverage.
    All,
    /// Features intersecting `[min_lon, min_lat, max_lon, max_lat]`.
    Bbox { bbox: [f64; 4] },
}

/// An extraction request. The labels are copied onto every extracted feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionQuery {
    #[serde(flatten)]
    pub selector: Selector,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// CRS of the stored features, consulted only when the dataset is not in EPSG:4326.
    #[serde(default)]
    pub source_epsg: Option<u32>,
}

impl ExtractionQuery {
    fn with_selector(selector: Selector) -> Self {
        Self { selector, district: None, sector: None, year: None, source_epsg: None }
    }

    pub fn all() -> Self { Self::with_selector(Selector::All) }

    pub fn bbox(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self::with_selector(Selector::Bbox { bbox: [min_lon, min_lat, max_lon, max_lat] })
    }

    pub fn with_labels(mut self, district: Option<String>, sector: Option<String>, year: Option<i32>) -> Self {
        self.district = district;
        self.sector = sector;
        self.year = year;
        self
    }

    pub fn with_source_epsg(mut self, epsg: Option<u32>) -> Self {
        self.source_epsg = epsg;
        self
    }

    /// The query rectangle with swapped corners normalized, or None in "all" mode.
    /// Degenerate rectangles are allowed; non-finite corners are not.
    pub fn window(&self) -> Result<Option<Rect<f64>>> {
        let Selector::Bbox { bbox } = self.selector else { return Ok(None) };
        if let Some(bad) = bbox.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidQuery(format!("bbox coordinate {bad} is not finite")));
        }
        let [x0, y0, x1, y1] = bbox;
        // Rect::new orders the corners.
        Ok(Some(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_corners_are_normalized() {
        let rect = ExtractionQuery::bbox(1.0, 1.0, 0.0, 0.0).window().unwrap().unwrap();
        assert_eq!(rect.min(), coord! { x: 0.0, y: 0.0 });
        assert_eq!(rect.max(), coord! { x: 1.0, y: 1.0 });
    }

    #[test]
    fn degenerate_box_is_allowed() {
        let rect = ExtractionQuery::bbox(2.0, 3.0, 2.0, 3.0).window().unwrap().unwrap();
        assert_eq!(rect.width(), 0.0);
        assert_eq!(rect.height(), 0.0);
    }

    #[test]
    fn non_finite_box_is_rejected() {
        let query = ExtractionQuery::bbox(0.0, f64::NAN, 1.0, 1.0);
        assert!(matches!(query.window(), Err(Error::InvalidQuery(_))));
        let query = ExtractionQuery::bbox(0.0, 0.0, f64::INFINITY, 1.0);
        assert!(matches!(query.window(), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn all_mode_has_no_window() {
        assert_eq!(ExtractionQuery::all().window().unwrap(), None);
    }

    #[test]
    fn query_reads_from_json() {
        let query: ExtractionQuery = serde_json::from_str(
            r#"{"mode": "bbox", "bbox": [30.0, -2.0, 30.1, -1.9], "district": "Gasabo", "year": 2024}"#,
        ).unwrap();
        assert_eq!(query.selector, Selector::Bbox { bbox: [30.0, -2.0, 30.1, -1.9] });
        assert_eq!(query.district.as_deref(), Some("Gasabo"));
        assert_eq!(query.year, Some(2024));

        let query: ExtractionQuery = serde_json::from_str(r#"{"mode": "all"}"#).unwrap();
        assert_eq!(query, ExtractionQuery::all());
    }
}
