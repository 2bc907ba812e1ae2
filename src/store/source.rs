use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};

use crate::common::ensure_dir_exists;
use crate::config::DEFAULT_MAX_DOCUMENT_BYTES;
use crate::dataset::{Dataset, DatasetHeader};
use crate::error::{Error, Result};
use crate::store::document::{decode_document, encode_document};
use crate::store::manifest::{FileHash, Manifest, ManifestEntry, MANIFEST_FILE};

/// Persists whole datasets by upload id. A round trip through `put`/`get`
/// returns the same features, geometry and attributes.
pub trait FeatureStore: Send + Sync {
    /// Store (or replace) a dataset under its `upload_id`.
    fn put(&mut self, dataset: &Dataset) -> Result<String>;

    /// Fetch a dataset; `NotFound` for unknown ids.
    fn get(&self, upload_id: &str) -> Result<Dataset>;

    fn list(&self) -> Result<Vec<DatasetHeader>>;

    /// Remove a dataset; false if it was not there.
    fn delete(&mut self, upload_id: &str) -> Result<bool>;
}

/// Upload ids become file names, so keep them to a safe alphabet.
fn check_id(upload_id: &str) -> Result<()> {
    let ok = !upload_id.is_empty()
        && upload_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok { Ok(()) } else { Err(Error::NotFound(upload_id.to_string())) }
}

/// In-memory store holding serialized documents.
#[derive(Debug, Clone)]
pub struct MemStore {
    docs: AHashMap<String, Arc<[u8]>>,
    max_bytes: usize,
}

impl Default for MemStore {
    fn default() -> Self { Self::new(DEFAULT_MAX_DOCUMENT_BYTES) }
}

impl MemStore {
    pub fn new(max_bytes: usize) -> Self { Self { docs: AHashMap::new(), max_bytes } }
}

impl FeatureStore for MemStore {
    fn put(&mut self, dataset: &Dataset) -> Result<String> {
        let bytes = encode_document(dataset, self.max_bytes)?;
        self.docs.insert(dataset.upload_id.clone(), Arc::from(bytes));
        Ok(dataset.upload_id.clone())
    }

    fn get(&self, upload_id: &str) -> Result<Dataset> {
        let bytes = self.docs.get(upload_id).ok_or_else(|| Error::NotFound(upload_id.to_string()))?;
        decode_document(bytes)
    }

    fn list(&self) -> Result<Vec<DatasetHeader>> {
        let mut headers = self.docs.values()
            .map(|bytes| decode_document(bytes).map(|dataset| dataset.header()))
            .collect::<Result<Vec<_>>>()?;
        headers.sort_by(|a, b| a.upload_id.cmp(&b.upload_id));
        Ok(headers)
    }

    fn delete(&mut self, upload_id: &str) -> Result<bool> {
        Ok(self.docs.remove(upload_id).is_some())
    }
}

/// Directory-backed store: one gzip JSON document per dataset plus a
/// `manifest.json` with sha256 hashes checked on every read.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
    max_bytes: usize,
}

impl DiskStore {
    pub fn open(root: impl Into<PathBuf>, max_bytes: usize) -> Result<Self> {
        let root = root.into();
        ensure_dir_exists(&root.join("datasets"))?;
        Ok(Self { root, max_bytes })
    }

    #[inline] pub fn root(&self) -> &std::path::Path { &self.root }

    /// Write `bytes` to `rel` through a temporary file in the store directory.
    fn write_atomic(&self, rel: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(rel);
        let dir = path.parent().unwrap_or(self.root.as_path());
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        self.write_atomic(MANIFEST_FILE, &manifest.to_bytes()?)
    }
}

impl FeatureStore for DiskStore {
    fn put(&mut self, dataset: &Dataset) -> Result<String> {
        check_id(&dataset.upload_id)?;
        let json = encode_document(dataset, self.max_bytes)?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        let file = format!("datasets/{}.json.gz", dataset.upload_id);
        self.write_atomic(&file, &compressed)?;

        let mut manifest = Manifest::load(&self.root)?;
        manifest.datasets.insert(dataset.upload_id.clone(), ManifestEntry {
            header: dataset.header(),
            file,
            hash: FileHash::of(&compressed),
            bytes: json.len(),
        });
        self.save_manifest(&manifest)?;

        info!("stored dataset {} ({} features, {} bytes)", dataset.upload_id, dataset.len(), json.len());
        Ok(dataset.upload_id.clone())
    }

    fn get(&self, upload_id: &str) -> Result<Dataset> {
        check_id(upload_id)?;
        let manifest = Manifest::load(&self.root)?;
        let entry = manifest.datasets.get(upload_id).ok_or_else(|| Error::NotFound(upload_id.to_string()))?;

        let compressed = std::fs::read(self.root.join(&entry.file))?;
        let actual = FileHash::of(&compressed);
        if actual.sha256 != entry.hash.sha256 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("checksum mismatch for {}", entry.file),
            )));
        }

        let mut json = Vec::with_capacity(entry.bytes);
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
        debug!("loaded dataset {upload_id} ({} bytes)", json.len());
        decode_document(&json)
    }

    fn list(&self) -> Result<Vec<DatasetHeader>> {
        Ok(Manifest::load(&self.root)?.datasets.into_values().map(|entry| entry.header).collect())
    }

    fn delete(&mut self, upload_id: &str) -> Result<bool> {
        check_id(upload_id)?;
        let mut manifest = Manifest::load(&self.root)?;
        let Some(entry) = manifest.datasets.remove(upload_id) else { return Ok(false) };
        self.save_manifest(&manifest)?;
        let path = self.root.join(&entry.file);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(true)
    }
}
