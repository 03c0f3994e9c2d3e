//! Ingestion log - idempotency ledger of already-consumed batch files.
//!
//! A batch path is marked only after its rows are durably appended to the
//! raw relation; a failed append leaves the log untouched so the next run
//! reprocesses the batch.

use crate::error::{CatalogueError, Result};
use crate::store::CatalogueStore;
use chrono::Utc;
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

pub const LOG_RELATION: &str = "ingested_files";

pub struct IngestionLog<'a> {
    store: &'a CatalogueStore,
}

impl<'a> IngestionLog<'a> {
    pub fn new(store: &'a CatalogueStore) -> Self {
        Self { store }
    }

    /// All paths marked so far. An absent log relation means nothing has
    /// been ingested yet.
    pub fn ingested_paths(&self) -> Result<HashSet<String>> {
        let Some(df) = self.store.read_relation(LOG_RELATION)? else {
            return Ok(HashSet::new());
        };
        let paths = df.column("file_path")?.str()?;
        Ok(paths.into_iter().flatten().map(str::to_string).collect())
    }

    pub fn is_ingested(&self, path: &Path) -> Result<bool> {
        Ok(self.ingested_paths()?.contains(&path.display().to_string()))
    }

    /// Append one entry. Double-marking the same path violates the log's
    /// uniqueness invariant and is refused.
    pub fn mark_ingested(&self, path: &Path) -> Result<()> {
        let entry = path.display().to_string();
        let row = df![
            "file_path" => [entry.as_str()],
            "ingested_at" => [Utc::now().to_rfc3339().as_str()],
        ]?;
        let mut log = match self.store.read_relation(LOG_RELATION)? {
            Some(existing) => {
                let known = existing.column("file_path")?.str()?;
                if known.into_iter().flatten().any(|p| p == entry) {
                    return Err(CatalogueError::Ingest(format!(
                        "Already marked as ingested: {entry}"
                    )));
                }
                existing.vstack(&row)?
            }
            None => row,
        };
        self.store.write_relation(LOG_RELATION, &mut log)?;
        debug!(path = %entry, "batch marked as ingested");
        Ok(())
    }
}
