use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use rstar::{RTree, AABB};

use super::BoundingBox;

/// A read-only list of shapes with an R-tree over their envelopes.
/// Shapes without an envelope (empty geometries) are kept but never returned by queries.
#[derive(Debug, Clone)]
pub(crate) struct ShapeIndex {
    rtree: RTree<BoundingBox>,
}

impl ShapeIndex {
    /// Bulk-load the envelopes of `shapes`; positions in `shapes` become the indices returned by queries.
    pub(crate) fn new<'a>(shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.into_iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
        }
    }

    /// Indices of the shapes whose envelope intersects `envelope`, in ascending order.
    pub(crate) fn candidates(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(envelope)
            .map(BoundingBox::idx)
            .collect();
        hits.sort_unstable();
        hits
    }

    #[inline] pub(crate) fn size(&self) -> usize { self.rtree.size() }
}

/// Union of the bounding rectangles of all shapes, or None if none has one.
pub(crate) fn merged_bounds<'a>(shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Option<Rect<f64>> {
    shapes.into_iter()
        .filter_map(|shape| shape.bounding_rect())
        .reduce(|a, b| Rect::new(
            Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        ))
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};
    use rstar::AABB;

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size), (x: x, y: y),
        ]])
    }

    #[test]
    fn candidates_are_sorted_and_skip_empty_shapes() {
        let shapes = vec![square(5.0, 5.0, 1.0), MultiPolygon::new(vec![]), square(0.0, 0.0, 1.0)];
        let index = ShapeIndex::new(&shapes);
        assert_eq!(index.size(), 2);

        let all = AABB::from_corners([-1.0, -1.0], [10.0, 10.0]);
        assert_eq!(index.candidates(&all), vec![0, 2]);

        let corner = AABB::from_corners([0.5, 0.5], [0.6, 0.6]);
        assert_eq!(index.candidates(&corner), vec![2]);
    }

    #[test]
    fn merged_bounds_spans_all_shapes() {
        let shapes = vec![square(0.0, 0.0, 1.0), square(3.0, -2.0, 1.0)];
        let rect = merged_bounds(&shapes).unwrap();
        assert_eq!(rect.min(), Coord { x: 0.0, y: -2.0 });
        assert_eq!(rect.max(), Coord { x: 4.0, y: 1.0 });
        assert!(merged_bounds(&Vec::<MultiPolygon<f64>>::new()).is_none());
    }
}
