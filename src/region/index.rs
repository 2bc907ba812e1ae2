use geo::{Contains, Point};
use rstar::AABB;

use crate::geom::ShapeIndex;
use crate::region::BoundaryEntry;

/// Point-in-polygon lookup over named boundaries, for centroid tagging.
/// Read-only after `build`; safe to share across threads.
#[derive(Debug, Clone)]
pub struct RegionIndex {
    entries: Vec<BoundaryEntry>,
    shapes: ShapeIndex,
}

impl RegionIndex {
    /// Bulk-load an R-tree over the entries' envelopes.
    pub fn build(entries: Vec<BoundaryEntry>) -> Self {
        let shapes = ShapeIndex::new(entries.iter().map(|entry| &entry.geometry));
        Self { entries, shapes }
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Name of the first boundary (in input order) that contains `point`.
    /// Envelope hits are confirmed with a true containment test.
    pub fn lookup(&self, point: Point<f64>) -> Option<&str> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.shapes.candidates(&envelope).into_iter()
            .map(|i| &self.entries[i])
            .find(|entry| entry.geometry.contains(&point))
            .and_then(|entry| entry.name.as_deref())
    }
}
