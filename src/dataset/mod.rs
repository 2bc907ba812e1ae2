mod dataset;
mod feature;

pub use dataset::{
    ConversionLog, Dataset, DatasetHeader, DatasetInfo, DatasetMetadata, RasterInfo, SkippedRecord, SourceKind,
};
pub(crate) use dataset::rect_array;
pub use feature::{AttrValue, Attributes, Feature};
