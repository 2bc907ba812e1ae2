use anyhow::{bail, Context, Result};
use serde_json::json;

use geoextract::FeatureStore;

use crate::cli::{Cli, DatasetArgs, ExportArgs};
use crate::commands::output::{print_json, write_file};
use crate::commands::Session;

pub fn list(cli: &Cli) -> Result<()> {
    let session = Session::open(cli)?;
    let headers = session.store.list().context("[datasets] Failed to read store manifest")?;
    print_json(&serde_json::to_value(headers)?)
}

pub fn show(cli: &Cli, args: &DatasetArgs) -> Result<()> {
    let session = Session::open(cli)?;
    let dataset = session.store.get(&args.upload_id)
        .with_context(|| format!("[datasets] Failed to load {}", args.upload_id))?;
    print_json(&json!({
        "header": dataset.header(),
        "metadata": dataset.metadata,
    }))
}

pub fn export(cli: &Cli, args: &ExportArgs) -> Result<()> {
    let session = Session::open(cli)?;
    let dataset = session.store.get(&args.upload_id)
        .with_context(|| format!("[datasets] Failed to load {}", args.upload_id))?;
    let bytes = serde_json::to_vec(&dataset.to_feature_collection())?;
    write_file(&args.out, &bytes, args.force)?;
    eprintln!("Exported {} features -> {}", dataset.len(), args.out.display());
    Ok(())
}

pub fn delete(cli: &Cli, args: &DatasetArgs) -> Result<()> {
    let mut session = Session::open(cli)?;
    if !session.store.delete(&args.upload_id)? {
        bail!("[datasets] No dataset {}", args.upload_id);
    }
    eprintln!("Deleted {}", args.upload_id);
    Ok(())
}
