//! Bbox- and "all"-scoped extraction with intersection metrics and area-weighted aggregates.
mod engine;
mod query;
mod stats;

pub use engine::{ExtractedFeature, ExtractionEngine, ExtractionResult, ExtractionSummary, QueryRegion};
pub use query::{ExtractionQuery, Selector};
pub use stats::ValueStatistics;
