use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile as shp;

/// Convert shapefile rings into a geo::MultiPolygon.
/// Shapefiles store each outer ring followed by its holes; `xy` reads a vertex
/// so the same grouping works for plain, M and Z polygons.
pub(crate) fn shp_rings_to_geo<P>(rings: &[shp::PolygonRing<P>], xy: impl Fn(&P) -> (f64, f64)) -> MultiPolygon<f64> {
    fn closed(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
        if coords.first().is_some_and(|first| Some(first) != coords.last()) {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        let (points, is_exterior) = match ring {
            shp::PolygonRing::Outer(points) => (points, true),
            shp::PolygonRing::Inner(points) => (points, false),
        };
        let ls = closed(points.iter().map(|p| { let (x, y) = xy(p); Coord { x, y } }).collect());

        if is_exterior {
            if let Some(ext) = current_exterior.take() {
                polys.push(Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else if current_exterior.is_some() {
            current_holes.push(ls);
        } else {
            // A hole before any outer ring is really an outer ring with the wrong winding.
            current_exterior = Some(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}
