use geo::{Coord, LineString, MultiPolygon, Rect};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// North-up affine georeferencing of a grid:
/// `x = origin_x + col * pixel_width`, `y = origin_y + row * pixel_height`.
/// `pixel_height` is negative for the usual top-down row order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Map fractional pixel coordinates `(col, row)` to CRS coordinates.
    #[inline]
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + col * self.pixel_width,
            y: self.origin_y + row * self.pixel_height,
        }
    }

    /// Map CRS coordinates to fractional pixel coordinates `(col, row)`.
    #[inline]
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.origin_x) / self.pixel_width, (y - self.origin_y) / self.pixel_height)
    }

    /// Transform of a window whose top-left cell is `(col, row)` of this grid.
    pub fn window(&self, col: usize, row: usize) -> Self {
        let origin = self.pixel_to_geo(col as f64, row as f64);
        Self { origin_x: origin.x, origin_y: origin.y, ..*self }
    }

    /// Extent of a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> Rect<f64> {
        Rect::new(self.pixel_to_geo(0.0, 0.0), self.pixel_to_geo(width as f64, height as f64))
    }
}

/// A single-band grid with georeferencing. Cells that are non-finite or equal
/// to `nodata` are invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub data: Array2<f64>,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    /// CRS declared by the file, if any.
    pub epsg: Option<u32>,
}

impl Raster {
    pub fn new(data: Array2<f64>, transform: GeoTransform, nodata: Option<f64>) -> Self {
        Self { data, transform, nodata, epsg: None }
    }

    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = Some(epsg);
        self
    }

    #[inline] pub fn width(&self) -> usize { self.data.ncols() }

    #[inline] pub fn height(&self) -> usize { self.data.nrows() }

    #[inline]
    pub fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && self.nodata != Some(value)
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| self.is_valid(v)).count()
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.transform.bounds(self.width(), self.height())
    }

    /// Centre of the grid in CRS coordinates, used as the CRS sample point.
    pub fn center(&self) -> Coord<f64> {
        self.transform.pixel_to_geo(self.width() as f64 / 2.0, self.height() as f64 / 2.0)
    }

    /// Round valid cells to the nearest multiple of `step`.
    pub fn quantize(&mut self, step: f64) {
        if !(step > 0.0) { return; }
        let nodata = self.nodata;
        self.data.mapv_inplace(|v| {
            if v.is_finite() && nodata != Some(v) { (v / step).round() * step } else { v }
        });
    }

    /// Crop to the envelope of `boundary` (in this raster's CRS) and invalidate
    /// cells whose centre lies outside it.
    /// Fails with `NoValidData` when nothing valid is left.
    pub fn mask_to(&self, boundary: &MultiPolygon<f64>) -> Result<Raster> {
        let Some(window) = self.window_of(boundary) else { return Err(Error::NoValidData) };
        let (col0, row0, col1, row1) = window;

        let mut data = self.data.slice(s![row0..row1, col0..col1]).to_owned();
        let transform = self.transform.window(col0, row0);
        let inside = scanline_mask(boundary, &transform, data.nrows(), data.ncols());
        ndarray::Zip::from(&mut data).and(&inside).for_each(|v, &keep| {
            if !keep { *v = f64::NAN; }
        });

        let masked = Raster { data, transform, nodata: self.nodata, epsg: self.epsg };
        if masked.valid_count() == 0 {
            return Err(Error::NoValidData);
        }
        Ok(masked)
    }

    /// Pixel window `(col0, row0, col1, row1)` covering the envelope of `boundary`, clamped to the grid.
    fn window_of(&self, boundary: &MultiPolygon<f64>) -> Option<(usize, usize, usize, usize)> {
        use geo::BoundingRect;
        let rect = boundary.bounding_rect()?;
        let (ca, ra) = self.transform.geo_to_pixel(rect.min().x, rect.min().y);
        let (cb, rb) = self.transform.geo_to_pixel(rect.max().x, rect.max().y);

        let clamp = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
        let col0 = clamp(ca.min(cb).floor(), self.width());
        let col1 = clamp(ca.max(cb).ceil(), self.width());
        let row0 = clamp(ra.min(rb).floor(), self.height());
        let row1 = clamp(ra.max(rb).ceil(), self.height());

        (col0 < col1 && row0 < row1).then_some((col0, row0, col1, row1))
    }
}

/// Even-odd scanline fill: true for cells whose centre lies inside `boundary`.
fn scanline_mask(boundary: &MultiPolygon<f64>, transform: &GeoTransform, rows: usize, cols: usize) -> Array2<bool> {
    let rings: Vec<&LineString<f64>> = boundary.0.iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .collect();

    let mut mask = Array2::from_elem((rows, cols), false);
    let mut crossings: Vec<f64> = Vec::new();
    for row in 0..rows {
        let y = transform.pixel_to_geo(0.0, row as f64 + 0.5).y;

        crossings.clear();
        for ring in &rings {
            for line in ring.lines() {
                let (a, b) = (line.start, line.end);
                if (a.y <= y) != (b.y <= y) {
                    let x = a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y);
                    crossings.push(transform.geo_to_pixel(x, y).0);
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            // Cells whose centre column `c + 0.5` lies in [lo, hi).
            let start = (pair[0] - 0.5).ceil().max(0.0) as usize;
            let end = ((pair[1] - 0.5).ceil().max(0.0) as usize).min(cols);
            for col in start..end {
                mask[[row, col]] = true;
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use geo::polygon;
    use ndarray::array;

    use super::*;

    fn grid(data: Array2<f64>) -> Raster {
        Raster::new(data, GeoTransform::new(0.0, 4.0, 1.0, -1.0), Some(-9999.0))
    }

    #[test]
    fn transform_round_trips() {
        let t = GeoTransform::new(30.0, -1.0, 0.01, -0.01);
        let c = t.pixel_to_geo(10.0, 20.0);
        let (col, row) = t.geo_to_pixel(c.x, c.y);
        assert!((col - 10.0).abs() < 1e-9 && (row - 20.0).abs() < 1e-9);
        assert_eq!(t.window(10, 20).pixel_to_geo(0.0, 0.0), c);
    }

    #[test]
    fn quantize_skips_nodata() {
        let mut r = grid(array![[1.2, 1.8], [-9999.0, 2.6]]);
        r.quantize(0.5);
        assert_eq!(r.data, array![[1.0, 2.0], [-9999.0, 2.5]]);
    }

    #[test]
    fn mask_crops_and_blanks_outside_cells() {
        let r = grid(Array2::from_elem((4, 4), 5.0));
        // Lower-left 2x2 block with its top-right corner cut off along x + y = 2.8.
        let boundary = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 0.8), (x: 0.8, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0),
        ]]);
        let masked = r.mask_to(&boundary).unwrap();
        assert_eq!((masked.width(), masked.height()), (2, 2));
        assert_eq!(masked.transform.pixel_to_geo(0.0, 0.0), Coord { x: 0.0, y: 2.0 });
        // Centres (0.5,1.5), (0.5,0.5) and (1.5,0.5) are inside, (1.5,1.5) is cut off.
        assert_eq!(masked.valid_count(), 3);
        assert!(masked.data[[0, 1]].is_nan());
    }

    #[test]
    fn mask_outside_grid_has_no_data() {
        let r = grid(Array2::from_elem((4, 4), 5.0));
        let far = MultiPolygon::new(vec![polygon![(x: 10.0, y: 10.0), (x: 11.0, y: 10.0), (x: 11.0, y: 11.0), (x: 10.0, y: 10.0)]]);
        assert!(matches!(r.mask_to(&far), Err(Error::NoValidData)));
    }

    #[test]
    fn mask_over_nodata_only_has_no_data() {
        let r = grid(Array2::from_elem((4, 4), -9999.0));
        let all = MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0), (x: 0.0, y: 4.0), (x: 0.0, y: 0.0)]]);
        assert!(matches!(r.mask_to(&all), Err(Error::NoValidData)));
    }
}
