use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::common::ensure_dir_exists;
use crate::extract::ExtractionResult;
use crate::sink::WriteMode;

/// Receives extraction results for geo-queryable indexing.
pub trait SearchSink {
    fn name(&self) -> &'static str;

    /// Index every feature of `result` into `index`; returns the number of documents written.
    fn index(&mut self, index: &str, result: &ExtractionResult, mode: WriteMode) -> Result<usize>;
}

/// Index mapping: geometries as `geo_shape`, the centroid as `geo_point`.
fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "unique_id": { "type": "keyword" },
                "feature_id": { "type": "keyword" },
                "value": { "type": "float" },
                "intersection_area": { "type": "double" },
                "coverage_percentage": { "type": "float" },
                "centroid_point": { "type": "geo_point" },
                "geometry": { "type": "geo_shape" },
                "intersection_geometry": { "type": "geo_shape" },
                "original_properties": { "type": "object", "enabled": false },
                "associated_district": { "type": "keyword" },
                "associated_sector": { "type": "keyword" },
                "associated_year": { "type": "integer" },
                "extraction_type": { "type": "keyword" },
                "upload_id": { "type": "keyword" },
                "dataset_name": { "type": "keyword" },
            }
        }
    })
}

/// The bulk-API action and source lines for every feature.
pub fn bulk_lines(index: &str, result: &ExtractionResult) -> Result<Vec<String>> {
    let extraction_type = if result.is_bbox() { "bbox" } else { "all" };
    let bounding_box = serde_json::to_value(&result.bounding_box_used)?;

    let mut lines = Vec::with_capacity(result.features.len() * 2);
    for feature in &result.features {
        let mut doc = feature.to_json();
        if let Value::Object(fields) = &mut doc {
            fields.insert("extraction_type".into(), extraction_type.into());
            fields.insert("upload_id".into(), result.upload_id.clone().into());
            fields.insert("dataset_name".into(), json!(result.dataset_name));
            fields.insert("bounding_box".into(), bounding_box.clone());
        }
        lines.push(serde_json::to_string(&json!({ "index": { "_index": index, "_id": feature.unique_id } }))?);
        lines.push(serde_json::to_string(&doc)?);
    }
    Ok(lines)
}

/// Writes Elasticsearch bulk NDJSON files, one per index, plus the index mapping.
/// The files can be replayed with `POST _bulk`.
#[derive(Debug, Clone)]
pub struct NdjsonBulkSink {
    dir: PathBuf,
}

impl NdjsonBulkSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    #[inline] pub fn dir(&self) -> &Path { &self.dir }

    pub fn bulk_path(&self, index: &str) -> PathBuf { self.dir.join(format!("{index}.ndjson")) }
}

impl SearchSink for NdjsonBulkSink {
    fn name(&self) -> &'static str { "search" }

    fn index(&mut self, index: &str, result: &ExtractionResult, mode: WriteMode) -> Result<usize> {
        ensure_dir_exists(&self.dir)
            .with_context(|| format!("[sink::search] Failed to create {}", self.dir.display()))?;

        let mapping_path = self.dir.join(format!("{index}.mapping.json"));
        if mode == WriteMode::Replace || !mapping_path.exists() {
            std::fs::write(&mapping_path, serde_json::to_vec_pretty(&index_mapping())?)
                .with_context(|| format!("[sink::search] Failed to write mapping {}", mapping_path.display()))?;
        }

        let path = self.bulk_path(index);
        let file = match mode {
            WriteMode::Replace => File::create(&path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(&path),
        }.with_context(|| format!("[sink::search] Failed to open {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        for line in bulk_lines(index, result)? {
            writeln!(writer, "{line}")?;
        }
        writer.flush()
            .with_context(|| format!("[sink::search] Failed to write {}", path.display()))?;
        Ok(result.features.len())
    }
}
