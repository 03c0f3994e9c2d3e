//! Ingest driver - per-batch unify, append, mark, refresh.
//!
//! Batches are processed strictly one at a time: each is fully unified and
//! appended before the next starts. Partial successful work is preserved,
//! never rolled back; the ingestion log exactly reflects what was durably
//! appended.

use crate::batch;
use crate::category::Category;
use crate::derived::DerivedViewBuilder;
use crate::error::Result;
use crate::ingest_log::IngestionLog;
use crate::schema::{RelationSchema, SchemaEvolution};
use crate::store::CatalogueStore;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// What one batch ingestion did.
#[derive(Debug)]
pub struct BatchReport {
    pub category: Category,
    pub rows_appended: usize,
    pub schema_version: u32,
}

pub struct Ingestor<'a> {
    store: &'a CatalogueStore,
    views: DerivedViewBuilder,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a CatalogueStore) -> Result<Self> {
        Ok(Self {
            store,
            views: DerivedViewBuilder::with_default_root()?,
        })
    }

    pub fn with_view_builder(store: &'a CatalogueStore, views: DerivedViewBuilder) -> Self {
        Self { store, views }
    }

    /// Ingest every batch in `directory` not yet in the log, all three
    /// categories, in discovery order. Returns the number of batches
    /// newly ingested.
    pub fn ingest_dir(&self, directory: &Path) -> Result<usize> {
        let log = IngestionLog::new(self.store);
        let mut ingested = 0usize;
        for category in Category::ALL {
            for path in batch::list_new_batches(directory, category, &log)? {
                let report = self.ingest_batch(category, &path)?;
                info!(
                    batch = %path.display(),
                    category = %category,
                    rows = report.rows_appended,
                    "batch ingested"
                );
                ingested += 1;
            }
        }
        info!(new_batches = ingested, dir = %directory.display(), "ingestion complete");
        Ok(ingested)
    }

    /// Ingest one batch CSV into its category's raw relation. The log entry
    /// is written only after the append lands; the derived view is then
    /// recomputed unconditionally, on the fresh-relation path as well as the
    /// widened one.
    pub fn ingest_batch(&self, category: Category, path: &Path) -> Result<BatchReport> {
        let batch_df = read_batch_csv(path)?;
        let relation = category.raw_relation();

        let (mut appended, rows, version) = match self.store.read_relation(relation)? {
            None => {
                let schema = RelationSchema::of(&batch_df);
                let projected = schema.project(&batch_df)?;
                let rows = projected.height();
                (projected, rows, schema.version)
            }
            Some(target) => {
                let target_schema = RelationSchema::of(&target);
                let incoming = RelationSchema::of(&batch_df);
                let (unified, evolution) = target_schema.widen(&incoming);
                if let SchemaEvolution::AddColumns { added, new_version } = &evolution {
                    info!(
                        relation,
                        ?added,
                        version = *new_version,
                        "relation widened for batch"
                    );
                }
                let filled = unified.null_fill(target)?;
                let projected = unified.project(&batch_df)?;
                let rows = projected.height();
                (filled.vstack(&projected)?, rows, unified.version)
            }
        };

        self.store.write_relation(relation, &mut appended)?;
        IngestionLog::new(self.store).mark_ingested(path)?;

        let view = self.views.view(self.store, category)?;
        debug!(view = category.view_name(), rows = view.height(), "derived view refreshed");

        Ok(BatchReport {
            category,
            rows_appended: rows,
            schema_version: version,
        })
    }
}

/// Read a batch CSV the way the store types everything else: header row,
/// schema inferred from a sample.
pub fn read_batch_csv(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(crate::error::CatalogueError::NotFound(format!(
            "Batch not found: {}",
            path.display()
        )));
    }
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(1000))
        .finish()?
        .collect()?;
    Ok(df)
}
