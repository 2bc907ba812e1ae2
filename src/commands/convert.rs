use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use geoextract::config::ConversionOptions;
use geoextract::raster::{read_geotiff, RasterVectorizer};
use geoextract::vector::{ShapefileBundle, VectorIngestor};
use geoextract::{Dataset, DatasetInfo, Error, FeatureStore, Region};

use crate::cli::{Cli, ConvertArgs};
use crate::commands::output::print_json;
use crate::commands::Session;

/// Which converter a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input { Raster, Shapefile, Geojson }

fn options(args: &ConvertArgs) -> ConversionOptions {
    let defaults = ConversionOptions::default();
    ConversionOptions {
        simplify_tolerance: args.simplify_tolerance.unwrap_or(defaults.simplify_tolerance),
        max_features: args.max_features.unwrap_or(defaults.max_features),
        force_epsg: args.force_epsg,
        clip_to_region: !args.no_clip,
        quantize_step: args.quantize_step,
        add_region_tags: args.add_region_tags,
    }
}

/// Tagging was asked for but there is nothing to tag against.
fn tagging_unavailable(region: &Region, options: &ConversionOptions) -> bool {
    options.add_region_tags && !region.can_tag()
}

pub fn run(cli: &Cli, args: &ConvertArgs, input: Input) -> Result<()> {
    let mut session = Session::open(cli)?;
    let options = options(args);
    let info = DatasetInfo { data_type: args.data_type.clone(), year: args.year, name: args.name.clone() };
    let region = &session.region;
    if tagging_unavailable(region, &options) {
        warn!("[convert] region tagging requested but no district or sector boundaries are configured");
    }
    let clip = region.clip_boundary(&options);
    let path = &args.input;

    let dataset: Dataset = match input {
        Input::Raster => {
            let raster = read_geotiff(path)
                .with_context(|| format!("[convert] Failed to read raster {}", path.display()))?;
            RasterVectorizer::new(region).vectorize(&raster, clip, info, &options)
                .with_context(|| format!("[convert] Failed to vectorize {}", path.display()))?
        }
        Input::Shapefile => {
            let bundle = ShapefileBundle::open(path)
                .with_context(|| format!("[convert] Failed to open shapefile bundle {}", path.display()))?;
            VectorIngestor::new(region).ingest(&bundle, clip, info, &options)
                .with_context(|| format!("[convert] Failed to ingest {}", path.display()))?
        }
        Input::Geojson => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("[convert] Failed to read {}", path.display()))?;
            let collection: serde_json::Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("[convert] {} is not JSON", path.display()))?;
            VectorIngestor::new(region).ingest_geojson(&collection, clip, info, &options)
                .with_context(|| format!("[convert] Failed to import {}", path.display()))?
        }
    };

    let upload_id = match session.store.put(&dataset) {
        Ok(id) => id,
        Err(Error::OutputTooLarge { size, limit, suggestions }) => {
            print_json(&json!({
                "error": format!("dataset is {size} bytes, over the {limit} byte limit"),
                "suggestions": suggestions,
            }))?;
            anyhow::bail!("[convert] Output too large; retry with the suggested parameters");
        }
        Err(e) => return Err(e).context("[convert] Failed to store dataset"),
    };
    info!("stored {} as {upload_id}", path.display());

    let meta = &dataset.metadata;
    print_json(&json!({
        "upload_id": upload_id,
        "total_features": dataset.len(),
        "truncated": meta.truncated,
        "source_epsg": meta.source_epsg,
        "crs_note": meta.crs_note,
        "skipped": meta.skip_summary(),
        "bounds": meta.bounds,
    }))
}
