use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{Error, Result};

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("path exists but is not a directory: {}", path.display()),
            )));
        }
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Extract the given `.zip` file into `dest_dir`.
/// Entries that would escape `dest_dir` are rejected by the zip reader.
pub(crate) fn extract_zip(zip_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::InvalidArchive(format!("failed to read zip archive {}: {e}", zip_path.display())))?;

    archive.extract(dest_dir)
        .map_err(|e| Error::InvalidArchive(format!("failed to extract {}: {e}", zip_path.display())))?;

    Ok(())
}

/// First file under `root` (depth-first, sorted by name) with the given extension, case-insensitively.
pub(crate) fn find_file_with_extension(root: &Path, extension: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|path| path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension)))
}

/// The sibling of `path` with the given extension in either case, if it exists.
pub(crate) fn sibling_with_extension(path: &Path, extension: &str) -> Option<PathBuf> {
    [extension.to_lowercase(), extension.to_uppercase()].into_iter()
        .map(|ext| path.with_extension(ext))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_files_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("bundle").join("inner");
        ensure_dir_exists(&nested).unwrap();
        fs::write(nested.join("Sectors.SHP"), b"").unwrap();
        fs::write(nested.join("Sectors.prj"), b"").unwrap();

        let shp = find_file_with_extension(dir.path(), "shp").unwrap();
        assert!(shp.ends_with("bundle/inner/Sectors.SHP"));
        assert_eq!(sibling_with_extension(&shp, "prj"), Some(nested.join("Sectors.prj")));
        assert_eq!(sibling_with_extension(&shp, "cpg"), None);
    }

    #[test]
    fn garbage_is_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.zip");
        fs::write(&path, b"definitely not a zip").unwrap();
        let err = extract_zip(&path, dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidArchive(_)));
    }
}
