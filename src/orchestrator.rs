//! Drive scan orchestrator - decides, scans, ingests and records.
//!
//! One run moves a drive through an explicit state machine:
//! `Unscanned -> Scanning -> Ingesting -> Recorded(Ok)`, short-circuiting to
//! `Recorded(Skipped)` when every category already has rows for the drive
//! and force is unset, or to `Recorded(Failed)` when a scanner or the
//! ingest step errors. Whatever the terminal state, exactly one history row
//! is appended and exactly one snapshot row is upserted; on failure the
//! bookkeeping is best-effort and the original error is propagated, never
//! swallowed.
//!
//! The store handle is dropped before child-process scanners run, so the
//! single-writer assumption holds while collaborators are alive.

use crate::category::Category;
use crate::derived::{DerivedViewBuilder, DEFAULT_SCAN_ROOT, SOURCE_FILE_COL};
use crate::error::{CatalogueError, Result};
use crate::history::{self, HistorySources, ScanStatus};
use crate::ingest::Ingestor;
use crate::manifest::{DriveManifest, ManifestEntry};
use crate::scanner::{self, ScanInvoker};
use crate::store::CatalogueStore;
use crate::batch;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveScanState {
    Unscanned,
    Scanning,
    Ingesting,
    Recorded(ScanStatus),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub store_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub outdir: PathBuf,
    pub scan_root: String,
    pub force: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("catalogue"),
            manifest_path: PathBuf::from("drive_manifest.csv"),
            outdir: PathBuf::from("output"),
            scan_root: DEFAULT_SCAN_ROOT.to_string(),
            force: false,
        }
    }
}

/// Terminal report of one orchestrated run.
#[derive(Debug)]
pub struct ScanOutcome {
    pub status: ScanStatus,
    pub state: DriveScanState,
    pub scanned: Vec<Category>,
}

/// Which categories this session must (re)scan. Decided per category
/// independently: a category needs a scan iff its raw relation has no row
/// for the drive, unless force rescans all three.
#[derive(Debug, Clone, Copy, Default)]
struct CategoryNeeds {
    files: bool,
    photos: bool,
    videos: bool,
}

impl CategoryNeeds {
    fn any(&self) -> bool {
        self.files || self.photos || self.videos
    }

    fn scanned(&self) -> Vec<Category> {
        let mut out = Vec::new();
        if self.files {
            out.push(Category::Files);
        }
        if self.photos {
            out.push(Category::Photos);
        }
        if self.videos {
            out.push(Category::Videos);
        }
        out
    }
}

pub struct DriveScanOrchestrator<S: ScanInvoker> {
    scanner: S,
    options: ScanOptions,
}

impl<S: ScanInvoker> DriveScanOrchestrator<S> {
    pub fn new(scanner: S, options: ScanOptions) -> Self {
        Self { scanner, options }
    }

    pub fn scanner_ref(&self) -> &S {
        &self.scanner
    }

    pub fn run(&self, label: &str) -> Result<ScanOutcome> {
        let started_at = Utc::now();
        let manifest = DriveManifest::load(&self.options.manifest_path)?;
        let entry = manifest.lookup(label)?.clone();
        let views = DerivedViewBuilder::new(&self.options.scan_root)?;
        let mut state = DriveScanState::Unscanned;
        tracing::debug!(drive = label, ?state, "state transition");

        // Decide per category, then close the store before any child
        // process that might also open it.
        let needs = {
            let store = CatalogueStore::open(&self.options.store_dir)?;
            let mut needs = CategoryNeeds {
                files: !has_rows_for_drive(&store, Category::Files, label, &views)?,
                photos: !has_rows_for_drive(&store, Category::Photos, label, &views)?,
                videos: !has_rows_for_drive(&store, Category::Videos, label, &views)?,
            };
            if self.options.force {
                needs = CategoryNeeds {
                    files: true,
                    photos: true,
                    videos: true,
                };
            }
            needs
        };

        if !needs.any() {
            info!(drive = label, "already indexed in all categories; skipping scans");
            let store = CatalogueStore::open(&self.options.store_dir)?;
            history::upsert_snapshot(&store, label, &entry, Utc::now())?;
            history::append_history(
                &store,
                label,
                started_at,
                Utc::now(),
                ScanStatus::Skipped,
                &HistorySources::default(),
            )?;
            state = DriveScanState::Recorded(ScanStatus::Skipped);
            return Ok(ScanOutcome {
                status: ScanStatus::Skipped,
                state,
                scanned: Vec::new(),
            });
        }

        let drive_path = PathBuf::from(
            entry
                .container_mount()
                .unwrap_or_else(|| format!("{}/{}", self.options.scan_root, label)),
        );
        if !drive_path.exists() {
            return Err(CatalogueError::NotFound(format!(
                "Drive path not mounted: {}",
                drive_path.display()
            )));
        }

        let outdir_drive = self.options.outdir.join(label);
        std::fs::create_dir_all(&outdir_drive)?;

        state = DriveScanState::Scanning;
        tracing::debug!(drive = label, ?state, "state transition");
        if let Err(err) = self.run_scans(&drive_path, label, &outdir_drive, needs) {
            return Err(self.record_failure(label, &entry, started_at, err));
        }

        state = DriveScanState::Ingesting;
        tracing::debug!(drive = label, ?state, "state transition");
        {
            let store = CatalogueStore::open(&self.options.store_dir)?;
            let ingestor =
                Ingestor::with_view_builder(&store, DerivedViewBuilder::new(&self.options.scan_root)?);
            if let Err(err) = ingestor.ingest_dir(&outdir_drive) {
                return Err(self.record_failure(label, &entry, started_at, err));
            }

            history::upsert_snapshot(&store, label, &entry, Utc::now())?;
            history::append_history(
                &store,
                label,
                started_at,
                Utc::now(),
                ScanStatus::Ok,
                &HistorySources::latest(&outdir_drive),
            )?;
        }
        state = DriveScanState::Recorded(ScanStatus::Ok);

        info!(drive = label, "scan + ingest complete");
        Ok(ScanOutcome {
            status: ScanStatus::Ok,
            state,
            scanned: needs.scanned(),
        })
    }

    /// Run the external scans this session needs. A files scan run in this
    /// session lets the media scans work from extension-filtered path lists
    /// instead of a second full traversal.
    fn run_scans(
        &self,
        drive_path: &Path,
        label: &str,
        outdir_drive: &Path,
        needs: CategoryNeeds,
    ) -> Result<()> {
        let mut files_csv = None;
        if needs.files {
            self.scanner.scan_files(drive_path, label, outdir_drive)?;
            files_csv = batch::latest_batch(outdir_drive, Category::Files);
        }

        let lists = match &files_csv {
            Some(csv) if needs.photos || needs.videos => {
                Some(scanner::derive_media_lists(csv, outdir_drive)?)
            }
            _ => None,
        };

        if needs.photos {
            match &lists {
                Some(l) if l.photos.is_file() => {
                    self.scanner
                        .extract_photos_from_list(&l.photos, label, outdir_drive)?
                }
                _ => self.scanner.scan_photos(drive_path, label, outdir_drive)?,
            }
        }
        if needs.videos {
            match &lists {
                Some(l) if l.videos.is_file() => {
                    self.scanner
                        .extract_videos_from_list(&l.videos, label, outdir_drive)?
                }
                _ => self.scanner.scan_videos(drive_path, label, outdir_drive)?,
            }
        }
        Ok(())
    }

    /// Best-effort failure bookkeeping: try to record the failed run, but
    /// always return the original error.
    fn record_failure(
        &self,
        label: &str,
        entry: &ManifestEntry,
        started_at: chrono::DateTime<Utc>,
        err: CatalogueError,
    ) -> CatalogueError {
        warn!(drive = label, %err, "scan failed; attempting history record");
        let bookkeeping = (|| -> Result<()> {
            let store = CatalogueStore::open(&self.options.store_dir)?;
            history::upsert_snapshot(&store, label, entry, Utc::now())?;
            history::append_history(
                &store,
                label,
                started_at,
                Utc::now(),
                ScanStatus::Failed,
                &HistorySources::default(),
            )?;
            Ok(())
        })();
        if let Err(book_err) = bookkeeping {
            warn!(drive = label, %book_err, "failure bookkeeping itself failed");
        }
        err
    }
}

/// Whether a category's raw relation already holds at least one row whose
/// SourceFile sits on this drive.
pub fn has_rows_for_drive(
    store: &CatalogueStore,
    category: Category,
    label: &str,
    views: &DerivedViewBuilder,
) -> Result<bool> {
    let Some(raw) = store.read_relation(category.raw_relation())? else {
        return Ok(false);
    };
    let Ok(sources) = raw.column(SOURCE_FILE_COL) else {
        return Ok(false);
    };
    let sources = sources.str()?;
    let found = sources
        .into_iter()
        .flatten()
        .any(|s| views.drive_of(s) == Some(label));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_has_rows_for_drive() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogueStore::open(dir.path()).unwrap();
        let mut raw = df![
            SOURCE_FILE_COL => ["/host/Volumes/D1/a.jpg", "/host/Volumes/D2/b.jpg"],
        ]
        .unwrap();
        store.write_relation("photos_raw", &mut raw).unwrap();

        let views = DerivedViewBuilder::with_default_root().unwrap();
        assert!(has_rows_for_drive(&store, Category::Photos, "D1", &views).unwrap());
        assert!(!has_rows_for_drive(&store, Category::Photos, "D3", &views).unwrap());
        assert!(!has_rows_for_drive(&store, Category::Files, "D1", &views).unwrap());
    }
}
