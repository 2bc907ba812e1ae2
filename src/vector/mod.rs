//! Vector input: shapefile bundles and GeoJSON collections.
mod archive;
mod ingest;
mod pipeline;

pub use archive::ShapefileBundle;
pub use ingest::VectorIngestor;
