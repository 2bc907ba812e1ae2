//! Dataset persistence behind a small put/get contract.
mod document;
mod manifest;
mod source;

pub use document::{decode_document, encode_document, suggestions_for};
pub use source::{DiskStore, FeatureStore, MemStore};
