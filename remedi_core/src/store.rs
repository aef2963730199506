//! Key-value persistence port and its implementations.
//!
//! The registry persists the whole medication collection as a single blob
//! under a fixed key on every mutation. The [`Store`] trait keeps the
//! storage mechanism out of the core; [`FileStore`] is the production
//! implementation (one file per key with locking and atomic replace),
//! [`MemoryStore`] backs tests and embedding.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Blob store the registry persists through
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, blob: &str) -> Result<()>;
}

/// In-memory store backed by a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// File-backed store: each key maps to `<key>.json` in the data directory.
///
/// Writes go through a locked temp file and an atomic rename so a crash
/// mid-write never leaves a half-written blob; reads take a shared lock.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        file.unlock()?;
        read_result?;

        Ok(Some(contents))
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        // Unique temp file in the same directory so the rename is atomic
        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(blob.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(self.path_for(key)).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Persisted {} bytes under key {:?}", blob.len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("medications").unwrap(), None);

        store.set("medications", "[]").unwrap();
        assert_eq!(store.get("medications").unwrap(), Some("[]".into()));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        assert_eq!(store.get("medications").unwrap(), None);

        store.set("medications", r#"[{"name":"x"}]"#).unwrap();
        assert_eq!(
            store.get("medications").unwrap(),
            Some(r#"[{"name":"x"}]"#.into())
        );
    }

    #[test]
    fn test_file_store_overwrite_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.set("medications", "[1]").unwrap();
        store.set("medications", "[2]").unwrap();

        assert_eq!(store.get("medications").unwrap(), Some("[2]".into()));
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "medications.json")
            .collect();
        assert!(extras.is_empty(), "stray files left behind: {:?}", extras);
    }
}
