//! # redb-backed Embedding Cache
//!
//! Persists semantic index vectors across restarts, addressed by a content
//! fingerprint of (model, encoding strategy, corpus shape).
//!
//! - One table, fingerprint (hex string) -> versioned blob
//! - Single writer: entries are written in one transaction at index build
//! - A fingerprint that is not present is a cold start, never an error

use crate::VeritasError;
use crate::formats::{CachedEmbeddings, embeddings_from_bytes, embeddings_to_bytes};
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::{Path, PathBuf};

/// Table for embeddings: fingerprint -> serialized `CachedEmbeddings`
const EMBEDDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("embeddings");

/// File name of the cache database inside the cache directory.
pub const CACHE_FILE_NAME: &str = "embeddings.redb";

/// A disk-backed store of embedding blobs.
pub struct EmbeddingCache {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EmbeddingCache {
    /// Open or create the cache database inside `cache_dir`.
    pub fn open_dir(cache_dir: impl AsRef<Path>) -> Result<Self, VeritasError> {
        let dir = cache_dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| VeritasError::Cache(e.to_string()))?;
        Self::open(dir.join(CACHE_FILE_NAME))
    }

    /// Open or create a cache database at the given file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VeritasError> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(|e| VeritasError::Cache(e.to_string()))?;

        // Initialize the table so read transactions never miss it
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| VeritasError::Cache(e.to_string()))?;
            let _ = write_txn
                .open_table(EMBEDDINGS)
                .map_err(|e| VeritasError::Cache(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| VeritasError::Cache(e.to_string()))?;
        }

        Ok(Self { db, path })
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up vectors stored under `fingerprint`.
    ///
    /// Returns `Ok(None)` when there is no entry.
    pub fn load(&self, fingerprint: &str) -> Result<Option<CachedEmbeddings>, VeritasError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| VeritasError::Cache(e.to_string()))?;
        let table = read_txn
            .open_table(EMBEDDINGS)
            .map_err(|e| VeritasError::Cache(e.to_string()))?;
        let Some(entry) = table
            .get(fingerprint)
            .map_err(|e| VeritasError::Cache(e.to_string()))?
        else {
            return Ok(None);
        };
        embeddings_from_bytes(entry.value()).map(Some)
    }

    /// Store vectors under `fingerprint`, replacing any previous entry.
    pub fn store(&self, fingerprint: &str, cached: &CachedEmbeddings) -> Result<(), VeritasError> {
        let bytes = embeddings_to_bytes(cached)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| VeritasError::Cache(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(EMBEDDINGS)
                .map_err(|e| VeritasError::Cache(e.to_string()))?;
            table
                .insert(fingerprint, bytes.as_slice())
                .map_err(|e| VeritasError::Cache(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| VeritasError::Cache(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> CachedEmbeddings {
        CachedEmbeddings {
            dimension: 2,
            ranges: vec![(0, 1)],
            vectors: vec![vec![0.6, 0.8]],
        }
    }

    #[test]
    fn unknown_fingerprint_is_a_miss() {
        let temp = tempdir().expect("temp dir");
        let cache = EmbeddingCache::open_dir(temp.path()).expect("open cache");
        assert!(cache.load("deadbeef").expect("load").is_none());
    }

    #[test]
    fn store_then_load() {
        let temp = tempdir().expect("temp dir");
        let cache = EmbeddingCache::open_dir(temp.path()).expect("open cache");
        cache.store("abc", &sample()).expect("store");
        assert_eq!(cache.load("abc").expect("load"), Some(sample()));
    }

    #[test]
    fn entries_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        {
            let cache = EmbeddingCache::open_dir(temp.path()).expect("open cache");
            cache.store("abc", &sample()).expect("store");
        }
        let reopened = EmbeddingCache::open_dir(temp.path()).expect("reopen");
        assert_eq!(reopened.load("abc").expect("load"), Some(sample()));
        assert!(reopened.path().ends_with(CACHE_FILE_NAME));
    }

    #[test]
    fn unreadable_location_is_reported() {
        let temp = tempdir().expect("temp dir");
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"x").expect("write");
        assert!(matches!(
            EmbeddingCache::open_dir(&file),
            Err(VeritasError::Cache(_))
        ));
    }
}
