#![doc = "geoextract public API"]
mod common;
mod geom;

pub mod config;
pub mod crs;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod raster;
pub mod region;
pub mod sink;
pub mod store;
pub mod vector;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use dataset::{Attributes, Dataset, DatasetInfo, Feature};

#[doc(inline)]
pub use region::Region;

#[doc(inline)]
pub use store::{DiskStore, FeatureStore, MemStore};

#[doc(inline)]
pub use geom::{geometry_from_value, multipolygon_to_value};
