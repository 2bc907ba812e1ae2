//! Raster input: GeoTIFF decoding, masking and region polygonization.
mod geotiff;
mod grid;
mod polygonize;
mod vectorize;

pub use geotiff::read_geotiff;
pub use grid::{GeoTransform, Raster};
pub use vectorize::RasterVectorizer;
