use std::path::PathBuf;

use thiserror::Error;

/// Parameter changes that bring an oversized dataset under the document ceiling.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SizeSuggestions {
    pub simplify_tolerance: f64,
    pub max_features: usize,
    pub quantize_step: f64,
}

#[derive(Debug, Error)]
pub enum Error {
    /// No strategy placed the sample point inside the region; pass an explicit EPSG code.
    #[error("could not determine CRS for sample ({x}, {y}); supply an explicit EPSG code")]
    CrsUndetermined { x: f64, y: f64 },

    #[error("no valid data left after masking/cropping")]
    NoValidData,

    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    #[error("serialized dataset is {size} bytes, over the {limit} byte ceiling")]
    OutputTooLarge { size: usize, limit: usize, suggestions: SizeSuggestions },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid raster {path}: {reason}")]
    InvalidRaster { path: PathBuf, reason: String },

    #[error("unsupported CRS EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
