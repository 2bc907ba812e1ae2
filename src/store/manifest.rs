use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dataset::DatasetHeader;
use crate::error::Result;

pub(crate) const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FileHash {
    pub sha256: String,
}

impl FileHash {
    pub(crate) fn of(bytes: &[u8]) -> Self {
        Self { sha256: hex::encode(Sha256::digest(bytes)) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ManifestEntry {
    pub header: DatasetHeader,
    /// Store-relative path of the compressed document.
    pub file: String,
    pub hash: FileHash,
    /// Uncompressed document size.
    pub bytes: usize,
}

/// Index of everything in a disk store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Manifest {
    pub version: u32,
    pub datasets: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub(crate) fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self { version: 1, ..Self::default() });
        }
        Ok(serde_json::from_slice(&std::fs::read(path)?)?)
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
