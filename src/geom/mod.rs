mod bbox;
mod geojson;
mod ops;
mod shapes;

pub(crate) use bbox::{rect_envelope, BoundingBox};
pub use geojson::{geometry_from_value, multipolygon_to_value};
pub(crate) use geojson::serde_multipolygon;
pub use ops::{is_effectively_empty, rect_polygon, repair, simplify_preserving};
pub(crate) use shapes::{merged_bounds, ShapeIndex};
