use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Rect};

use crate::geom::{is_effectively_empty, repair, simplify_preserving};
use crate::region::{Region, RegionTags};

/// Why a record was dropped after its geometry was read.
pub(crate) const EMPTY_GEOMETRY: &str = "empty or invalid geometry";
pub(crate) const OUTSIDE_CLIP: &str = "outside clip boundary";
pub(crate) const EMPTIED_BY_SIMPLIFY: &str = "emptied by simplification";

/// Per-record geometry steps shared by the vector importers: repair, clip,
/// simplify and tag, all in the canonical CRS.
pub(crate) struct RecordPipeline<'a> {
    clip: Option<(&'a MultiPolygon<f64>, Rect<f64>)>,
    tolerance: f64,
    tagger: Option<&'a Region>,
}

impl<'a> RecordPipeline<'a> {
    pub(crate) fn new(clip: Option<&'a MultiPolygon<f64>>, tolerance: f64, tagger: Option<&'a Region>) -> Self {
        let clip = clip.and_then(|mp| mp.bounding_rect().map(|rect| (mp, rect)));
        Self { clip, tolerance, tagger }
    }

    pub(crate) fn process(&self, geometry: &MultiPolygon<f64>) -> Result<(MultiPolygon<f64>, RegionTags), &'static str> {
        let mut shape = repair(geometry);
        if is_effectively_empty(&shape) {
            return Err(EMPTY_GEOMETRY);
        }

        if let Some((boundary, rect)) = &self.clip {
            let inside = shape.bounding_rect().is_some_and(|own| own.intersects(rect));
            if !inside {
                return Err(OUTSIDE_CLIP);
            }
            shape = shape.intersection(*boundary);
            if is_effectively_empty(&shape) {
                return Err(OUTSIDE_CLIP);
            }
        }

        let shape = simplify_preserving(&shape, self.tolerance);
        if is_effectively_empty(&shape) {
            return Err(EMPTIED_BY_SIMPLIFY);
        }

        let tags = self.tagger.map(|region| region.tag(&shape)).unwrap_or_default();
        Ok((shape, tags))
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
        ]])
    }

    #[test]
    fn clip_keeps_only_the_overlap() {
        let boundary = square(0.0, 0.0, 2.0);
        let pipeline = RecordPipeline::new(Some(&boundary), 0.0, None);
        let (shape, tags) = pipeline.process(&square(1.0, 1.0, 2.0)).unwrap();
        assert!((shape.unsigned_area() - 1.0).abs() < 1e-9);
        assert_eq!(tags, RegionTags::default());
        assert_eq!(pipeline.process(&square(5.0, 5.0, 1.0)).unwrap_err(), OUTSIDE_CLIP);
    }

    #[test]
    fn touching_only_at_an_edge_is_outside() {
        let boundary = square(0.0, 0.0, 2.0);
        let pipeline = RecordPipeline::new(Some(&boundary), 0.0, None);
        assert_eq!(pipeline.process(&square(2.0, 0.0, 1.0)).unwrap_err(), OUTSIDE_CLIP);
    }

    #[test]
    fn tolerance_larger_than_the_shape_keeps_it() {
        let pipeline = RecordPipeline::new(None, 1.0, None);
        let (shape, _) = pipeline.process(&square(0.0, 0.0, 0.01)).unwrap();
        assert!((shape.unsigned_area() - 1e-4).abs() < 1e-12);
    }
}
