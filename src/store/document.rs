use crate::dataset::Dataset;
use crate::error::{Error, Result, SizeSuggestions};

/// Parameter changes likely to shrink `dataset` under the ceiling.
pub fn suggestions_for(dataset: &Dataset) -> SizeSuggestions {
    let meta = &dataset.metadata;
    SizeSuggestions {
        simplify_tolerance: (meta.simplify_tolerance * 2.0).max(0.003),
        max_features: (meta.max_features.unwrap_or(dataset.len()) / 2).max(1000),
        quantize_step: meta.quantize_step.unwrap_or(0.5),
    }
}

/// Serialize a dataset as a JSON document, rejecting it when larger than `max_bytes`.
pub fn encode_document(dataset: &Dataset, max_bytes: usize) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(dataset)?;
    if bytes.len() > max_bytes {
        return Err(Error::OutputTooLarge {
            size: bytes.len(),
            limit: max_bytes,
            suggestions: suggestions_for(dataset),
        });
    }
    Ok(bytes)
}

pub fn decode_document(bytes: &[u8]) -> Result<Dataset> {
    Ok(serde_json::from_slice(bytes)?)
}
