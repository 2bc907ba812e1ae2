use anyhow::{Context, Result};
use tracing::warn;

use geoextract::extract::{ExtractionEngine, ExtractionQuery};
use geoextract::sink::{publish, CsvTableSink, Labels, NdjsonBulkSink, SearchSink, TableSink, WriteMode};
use geoextract::FeatureStore;

use crate::cli::{Cli, ExtractArgs};
use crate::commands::output::{print_json, write_file};
use crate::commands::Session;

pub fn run(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let session = Session::open(cli)?;
    let dataset = session.store.get(&args.upload_id)
        .with_context(|| format!("[extract] Failed to load {}", args.upload_id))?;

    let query = match args.bbox.as_deref() {
        Some(&[min_lon, min_lat, max_lon, max_lat]) => ExtractionQuery::bbox(min_lon, min_lat, max_lon, max_lat),
        Some(other) => anyhow::bail!("[extract] --bbox takes 4 values, got {}", other.len()),
        None => ExtractionQuery::all(),
    };
    let year = args.year.or(dataset.year);
    let query = query
        .with_labels(args.district.clone(), args.sector.clone(), year)
        .with_source_epsg(args.source_epsg);

    let result = ExtractionEngine::new(session.region.resolver())
        .extract(&dataset, &query)
        .with_context(|| format!("[extract] Query against {} failed", args.upload_id))?;

    let mut search = args.search_out.as_ref().map(NdjsonBulkSink::new);
    let mut table = args.table_out.as_ref().map(CsvTableSink::new);
    let mut value = result.to_json();
    if search.is_some() || table.is_some() {
        let labels = Labels::new(args.district.clone(), args.sector.clone(), year);
        let mode = if args.append { WriteMode::Append } else { WriteMode::Replace };
        let report = publish(
            &result,
            &labels,
            search.as_mut().map(|s| s as &mut dyn SearchSink),
            table.as_mut().map(|t| t as &mut dyn TableSink),
            mode,
        );
        if !report.all_ok() {
            warn!("some sinks failed; the extraction result is still complete");
        }
        value["publish"] = serde_json::to_value(&report)?;
    }

    match &args.output {
        Some(path) => {
            write_file(path, &serde_json::to_vec_pretty(&value)?, args.force)?;
            eprintln!("Extracted {} features -> {}", result.features.len(), path.display());
            Ok(())
        }
        None => print_json(&value),
    }
}
