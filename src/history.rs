//! Scan bookkeeping - drive snapshots and append-only scan history.
//!
//! Every orchestrated run, whatever its outcome, upserts exactly one row in
//! the `drives` snapshot relation and appends exactly one row to the
//! `drive_scans` history relation.

use crate::batch;
use crate::category::Category;
use crate::error::Result;
use crate::manifest::ManifestEntry;
use crate::store::CatalogueStore;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const DRIVES_RELATION: &str = "drives";
pub const SCANS_RELATION: &str = "drive_scans";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStatus {
    Ok,
    Skipped,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Ok => "ok",
            ScanStatus::Skipped => "skipped",
            ScanStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category source CSVs referenced by one history record.
#[derive(Debug, Default)]
pub struct HistorySources {
    pub files: Option<PathBuf>,
    pub photos: Option<PathBuf>,
    pub videos: Option<PathBuf>,
}

impl HistorySources {
    /// Latest batch per category in the drive's output directory.
    pub fn latest(outdir: &Path) -> Self {
        Self {
            files: batch::latest_batch(outdir, Category::Files),
            photos: batch::latest_batch(outdir, Category::Photos),
            videos: batch::latest_batch(outdir, Category::Videos),
        }
    }
}

/// Replace (or create) the single snapshot row for this drive.
pub fn upsert_snapshot(
    store: &CatalogueStore,
    label: &str,
    entry: &ManifestEntry,
    last_scanned: DateTime<Utc>,
) -> Result<()> {
    let mount = entry.platform_mount.clone().or_else(|| entry.mac_mount());
    let row = df![
        "drive_label" => [label],
        "mount" => vec![mount],
        "volume_uuid" => vec![entry.volume_uuid.clone()],
        "serial_number" => vec![entry.serial_number.clone()],
        "notes" => vec![entry.notes.clone()],
        "last_scanned" => [last_scanned.to_rfc3339().as_str()],
    ]?;

    let mut snapshot = match store.read_relation(DRIVES_RELATION)? {
        Some(existing) => {
            let labels = existing.column("drive_label")?.str()?;
            let keep: BooleanChunked = labels
                .into_iter()
                .map(|v| Some(v != Some(label)))
                .collect();
            existing.filter(&keep)?.vstack(&row)?
        }
        None => row,
    };
    store.write_relation(DRIVES_RELATION, &mut snapshot)
}

/// Append one history record for a run.
pub fn append_history(
    store: &CatalogueStore,
    label: &str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    status: ScanStatus,
    sources: &HistorySources,
) -> Result<()> {
    let as_text = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
    let row = df![
        "drive_label" => [label],
        "started_at" => [started_at.to_rfc3339().as_str()],
        "ended_at" => [ended_at.to_rfc3339().as_str()],
        "status" => [status.as_str()],
        "files_csv" => vec![as_text(&sources.files)],
        "photos_csv" => vec![as_text(&sources.photos)],
        "videos_csv" => vec![as_text(&sources.videos)],
        "files_rows" => [count_csv_rows(sources.files.as_deref())],
        "photos_rows" => [count_csv_rows(sources.photos.as_deref())],
        "videos_rows" => [count_csv_rows(sources.videos.as_deref())],
    ]?;

    let mut history = match store.read_relation(SCANS_RELATION)? {
        Some(existing) => existing.vstack(&row)?,
        None => row,
    };
    store.write_relation(SCANS_RELATION, &mut history)
}

/// Data rows in a CSV, excluding the header. Unreadable or absent files
/// count as zero; history recording is best-effort around them.
fn count_csv_rows(path: Option<&Path>) -> i64 {
    let Some(path) = path else { return 0 };
    match std::fs::File::open(path) {
        Ok(file) => {
            let lines = BufReader::new(file).lines().map_while(|l| l.ok()).count() as i64;
            (lines - 1).max(0)
        }
        Err(_) => 0,
    }
}
