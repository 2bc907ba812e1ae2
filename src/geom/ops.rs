use geo::{Area, BooleanOps, LineString, MultiPolygon, Polygon, Rect, Simplify};

/// A closed ring needs at least four coordinates (first == last).
const MIN_RING_COORDS: usize = 4;

fn ring_is_usable(ring: &LineString<f64>) -> bool {
    ring.0.len() >= MIN_RING_COORDS
}

/// Drop polygons whose exterior collapsed and holes that collapsed.
fn drop_degenerate_rings(polygons: impl IntoIterator<Item = Polygon<f64>>) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.into_iter()
        .filter(|polygon| ring_is_usable(polygon.exterior()))
        .map(|polygon| {
            let (exterior, interiors) = polygon.into_inner();
            Polygon::new(exterior, interiors.into_iter().filter(ring_is_usable).collect())
        })
        .collect())
}

/// Repair self-intersections and overlaps, the equivalent of a zero-distance buffer.
/// The boolean union re-nodes every ring and resolves overlapping parts.
pub fn repair(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let cleaned = drop_degenerate_rings(mp.0.iter().cloned());
    if cleaned.0.is_empty() {
        return cleaned;
    }
    cleaned.union(&MultiPolygon::new(Vec::new()))
}

/// Douglas-Peucker on one ring. A ring the tolerance would collapse below a
/// closed triangle, or flatten to zero area, is kept as it was.
fn simplify_ring(ring: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    let simplified = ring.simplify(&tolerance);
    let flat = Polygon::new(simplified.clone(), Vec::new()).unsigned_area() <= 0.0;
    if !ring_is_usable(&simplified) || flat { ring.clone() } else { simplified }
}

/// Simplify every ring followed by a repair pass, so rings that cross after
/// simplification are re-noded instead of left invalid. Rings never collapse:
/// a non-empty input stays non-empty. A non-positive tolerance only repairs.
pub fn simplify_preserving(mp: &MultiPolygon<f64>, tolerance: f64) -> MultiPolygon<f64> {
    if !(tolerance > 0.0) {
        return repair(mp);
    }
    let simplified = mp.0.iter().map(|polygon| Polygon::new(
        simplify_ring(polygon.exterior(), tolerance),
        polygon.interiors().iter().map(|ring| simplify_ring(ring, tolerance)).collect(),
    ));
    let simplified = repair(&drop_degenerate_rings(simplified));
    if is_effectively_empty(&simplified) { repair(mp) } else { simplified }
}

/// True when nothing with positive area is left.
#[inline]
pub fn is_effectively_empty(mp: &MultiPolygon<f64>) -> bool {
    mp.0.is_empty() || mp.unsigned_area() <= 0.0
}

/// A rectangle as a single-polygon MultiPolygon, for boolean ops.
#[inline]
pub fn rect_polygon(rect: &Rect<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![rect.to_polygon()])
}
