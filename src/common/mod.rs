mod fs;
mod ids;
mod polygon;

pub(crate) use fs::*;
pub(crate) use ids::*;
pub(crate) use polygon::*;
