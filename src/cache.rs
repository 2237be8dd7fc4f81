//! Cache store for raw extractions, keyed by the SHA-256 of the PDF bytes.

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::model::RawExtraction;

/// Storage for [`RawExtraction`]s shared by all documents of a batch.
pub trait CacheStore: Send + Sync {
    /// Look up an entry. A missing entry is `Ok(None)`.
    fn get(&self, hash: &str) -> Result<Option<RawExtraction>>;

    /// Store an entry, replacing any existing one.
    fn put(&self, hash: &str, extraction: &RawExtraction) -> Result<()>;
}

/// One JSON file per entry: `{dir}/{hash}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `hash`.
    pub fn entry_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash))
    }
}

impl CacheStore for JsonFileCache {
    fn get(&self, hash: &str) -> Result<Option<RawExtraction>> {
        let path = self.entry_path(hash);
        if !path.is_file() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        match serde_json::from_slice(&data) {
            Ok(extraction) => Ok(Some(extraction)),
            Err(e) => {
                log::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn put(&self, hash: &str, extraction: &RawExtraction) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Cache(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let path = self.entry_path(hash);
        // Concurrent writers of one key each use their own temp file.
        let tmp = self.dir.join(format!(
            ".{}.{}.{:?}.tmp",
            hash,
            std::process::id(),
            std::thread::current().id()
        ));
        let data = serde_json::to_vec(extraction)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::Cache(format!("cannot write {}: {}", path.display(), e))
        })?;
        log::debug!("Cached extraction at {}", path.display());
        Ok(())
    }
}

/// In-memory cache, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, RawExtraction>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, hash: &str) -> Result<Option<RawExtraction>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".into()))?;
        Ok(entries.get(hash).cloned())
    }

    fn put(&self, hash: &str, extraction: &RawExtraction) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache lock poisoned".into()))?;
        entries.insert(hash.to_string(), extraction.clone());
        Ok(())
    }
}

/// Lowercase hex SHA-256 of the file's bytes.
pub fn file_hash<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = fs::File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
