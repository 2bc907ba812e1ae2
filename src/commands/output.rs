use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub fn assert_not_stdout(path: &Path) -> Result<()> {
    if path == Path::new("-") {
        bail!("stdout is not supported; provide a real file path.");
    }
    Ok(())
}

/// Write `bytes` to `target` through a temporary file and a rename.
pub fn write_file(target: &Path, bytes: &[u8], force: bool) -> Result<()> {
    assert_not_stdout(target)?;
    if !force && target.exists() {
        bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
    }
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir).context("create temp file")?;
    tmp.write_all(bytes).with_context(|| format!("write {}", target.display()))?;
    tmp.as_file().sync_all().ok();
    tmp.persist(target).with_context(|| format!("rename to {}", target.display()))?;
    Ok(())
}

/// Pretty JSON to stdout.
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
