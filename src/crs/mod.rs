//! Coordinate reference systems: the EPSG registry, sample-based CRS detection,
//! `.prj` parsing and reprojection into the canonical lon/lat CRS.
mod prj;
mod registry;
mod reproject;
mod resolve;

pub use prj::epsg_from_wkt;
pub use registry::{lookup, CrsDef, WGS84};
pub use reproject::{reproject, Transformer};
pub use resolve::{CrsResolver, Resolution, Strategy};
