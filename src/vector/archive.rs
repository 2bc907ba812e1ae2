use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::common::{extract_zip, find_file_with_extension, sibling_with_extension};
use crate::error::{Error, Result};

/// A located shapefile triplet. When it came from an archive, the extracted
/// files live in a scratch directory that is removed when the bundle drops.
#[derive(Debug)]
pub struct ShapefileBundle {
    shp_path: PathBuf,
    _scratch: Option<TempDir>,
}

impl ShapefileBundle {
    /// Open a `.zip` archive, a directory, or a `.shp` path.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Self::from_dir(path, None);
        }
        let is_shp = path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        if is_shp {
            return Ok(Self { shp_path: path.to_path_buf(), _scratch: None });
        }

        let scratch = tempfile::Builder::new().prefix("shapefile-").tempdir()?;
        extract_zip(path, scratch.path())?;
        debug!("extracted {} into {}", path.display(), scratch.path().display());
        let root = scratch.path().to_path_buf();
        Self::from_dir(&root, Some(scratch))
    }

    fn from_dir(root: &Path, scratch: Option<TempDir>) -> Result<Self> {
        let shp_path = find_file_with_extension(root, "shp")
            .ok_or_else(|| Error::InvalidArchive("no .shp file found in upload".to_string()))?;
        Ok(Self { shp_path, _scratch: scratch })
    }

    #[inline] pub fn shp_path(&self) -> &Path { &self.shp_path }

    /// Contents of the accompanying `.prj`, if present.
    pub fn projection_wkt(&self) -> Result<Option<String>> {
        match sibling_with_extension(&self.shp_path, "prj") {
            Some(prj) => Ok(Some(String::from_utf8_lossy(&std::fs::read(prj)?).into_owned())),
            None => Ok(None),
        }
    }
}
