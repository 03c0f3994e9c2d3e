//! Catalogue store - directory of Parquet relations.
//!
//! The store stands in for process-wide mutable state; a `CatalogueStore`
//! handle is passed explicitly through every component and dropped before
//! child-process scanners run, so only one writer touches the store at a
//! time. Each relation write goes through a staging file followed by a
//! rename, which is the only atomicity the store offers.

use crate::error::{CatalogueError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct CatalogueStore {
    root: PathBuf,
}

impl CatalogueStore {
    /// Open (creating if needed) the store directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open an existing store; missing directory is fatal.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogueError::NotFound(format!(
                "Store not found: {}",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    fn relation_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.parquet"))
    }

    pub fn relation_exists(&self, name: &str) -> bool {
        self.relation_path(name).is_file()
    }

    /// Read a whole relation. `Ok(None)` when the relation does not exist
    /// yet; an absent relation is an empty one, not an error.
    pub fn read_relation(&self, name: &str) -> Result<Option<DataFrame>> {
        let path = self.relation_path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let df = ParquetReader::new(file).finish()?;
        Ok(Some(df))
    }

    /// Replace a relation with `df`, writing through a staging file and
    /// renaming into place. On any failure the staging artifact is removed
    /// best-effort; a secondary cleanup error is suppressed so the original
    /// error surfaces.
    pub fn write_relation(&self, name: &str, df: &mut DataFrame) -> Result<()> {
        let target = self.relation_path(name);
        let staging = self.root.join(format!("{name}.parquet.staging"));
        let result = (|| -> Result<()> {
            let mut file = File::create(&staging)?;
            ParquetWriter::new(&mut file).finish(df)?;
            std::fs::rename(&staging, &target)?;
            Ok(())
        })();
        if result.is_err() {
            let _ = std::fs::remove_file(&staging);
        } else {
            debug!(relation = name, rows = df.height(), "relation written");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_relation_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogueStore::open(dir.path()).unwrap();
        assert!(store.read_relation("files_raw").unwrap().is_none());
        assert!(!store.relation_exists("files_raw"));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogueStore::open(dir.path()).unwrap();
        let mut df = df!["SourceFile" => ["/host/Volumes/D1/a.jpg"]].unwrap();
        store.write_relation("photos_raw", &mut df).unwrap();
        let back = store.read_relation("photos_raw").unwrap().unwrap();
        assert_eq!(back.height(), 1);
        // No staging artifact left behind.
        assert!(!dir.path().join("photos_raw.parquet.staging").exists());
    }

    #[test]
    fn test_open_existing_missing_is_not_found() {
        let err = CatalogueStore::open_existing("/unlikely/to/exist/___store___").unwrap_err();
        assert!(matches!(err, CatalogueError::NotFound(_)));
    }
}
