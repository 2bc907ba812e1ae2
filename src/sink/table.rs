use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::df;
use polars::io::SerWriter;
use polars::prelude::*;

use crate::common::ensure_dir_exists;
use crate::extract::ExtractionResult;
use crate::geom::multipolygon_to_value;
use crate::sink::WriteMode;

/// Receives extraction results as rows of a named table.
pub trait TableSink {
    fn name(&self) -> &'static str;

    /// Write one row per feature into `table`; returns the number of rows written.
    fn write_table(&mut self, table: &str, result: &ExtractionResult, mode: WriteMode) -> Result<usize>;
}

/// One row per extracted feature, geometries and properties as JSON text.
pub fn result_frame(result: &ExtractionResult) -> Result<DataFrame> {
    let features = &result.features;
    let extraction_type = if result.is_bbox() { "bbox" } else { "all" };
    Ok(df![
        "unique_id" => features.iter().map(|f| f.unique_id.clone()).collect::<Vec<_>>(),
        "value" => features.iter().map(|f| f.value).collect::<Vec<_>>(),
        "intersection_area" => features.iter().map(|f| f.intersection_area).collect::<Vec<_>>(),
        "coverage_percentage" => features.iter().map(|f| (f.coverage_percentage * 100.0).round() / 100.0).collect::<Vec<_>>(),
        "feature_centroid_lon" => features.iter().map(|f| f.centroid.map(|c| c[0])).collect::<Vec<_>>(),
        "feature_centroid_lat" => features.iter().map(|f| f.centroid.map(|c| c[1])).collect::<Vec<_>>(),
        "geometry" => features.iter().map(|f| multipolygon_to_value(&f.geometry).to_string()).collect::<Vec<_>>(),
        "intersection_geometry" => features.iter()
            .map(|f| f.intersection_geometry.as_ref().map(|g| multipolygon_to_value(g).to_string()))
            .collect::<Vec<_>>(),
        "original_properties" => features.iter().map(|f| f.properties.to_properties().to_string()).collect::<Vec<_>>(),
        "associated_district" => features.iter().map(|f| f.district.clone()).collect::<Vec<_>>(),
        "associated_sector" => features.iter().map(|f| f.sector.clone()).collect::<Vec<_>>(),
        "associated_year" => features.iter().map(|f| f.year).collect::<Vec<_>>(),
        "extraction_type" => features.iter().map(|_| extraction_type).collect::<Vec<_>>(),
        "upload_id" => features.iter().map(|_| result.upload_id.as_str()).collect::<Vec<_>>(),
    ]?)
}

/// Writes each table as `<dir>/<table>.csv`.
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    dir: PathBuf,
}

impl CsvTableSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    #[inline] pub fn dir(&self) -> &Path { &self.dir }

    pub fn table_path(&self, table: &str) -> PathBuf { self.dir.join(format!("{table}.csv")) }
}

impl TableSink for CsvTableSink {
    fn name(&self) -> &'static str { "table" }

    fn write_table(&mut self, table: &str, result: &ExtractionResult, mode: WriteMode) -> Result<usize> {
        ensure_dir_exists(&self.dir)
            .with_context(|| format!("[sink::table] Failed to create {}", self.dir.display()))?;
        let mut df = result_frame(result)?;
        let path = self.table_path(table);

        // Appending to an existing, non-empty table continues it without a second header.
        let continuing = mode == WriteMode::Append
            && std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let file = if continuing {
            OpenOptions::new().append(true).open(&path)
        } else {
            File::create(&path)
        }.with_context(|| format!("[sink::table] Failed to open {}", path.display()))?;

        CsvWriter::new(file)
            .include_header(!continuing)
            .finish(&mut df)
            .with_context(|| format!("[sink::table] Failed to write CSV to {}", path.display()))?;
        Ok(df.height())
    }
}
