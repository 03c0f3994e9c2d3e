//! Scan summary - latest run per drive, for quick operator review.

use crate::error::{CatalogueError, Result};
use crate::history::SCANS_RELATION;
use crate::store::CatalogueStore;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveScanSummary {
    pub drive_label: String,
    pub last_started_at: String,
    pub last_ended_at: String,
    pub status: String,
    pub files_rows: i64,
    pub photos_rows: i64,
    pub videos_rows: i64,
    pub duration_s: Option<i64>,
    pub total_rows: i64,
    pub rows_per_sec: Option<f64>,
}

/// Latest history record per drive, ordered by drive label.
pub fn last_scan_per_drive(store: &CatalogueStore) -> Result<Vec<DriveScanSummary>> {
    let history = store.read_relation(SCANS_RELATION)?.ok_or_else(|| {
        CatalogueError::NotFound(format!(
            "{SCANS_RELATION} relation not found; run a scan first"
        ))
    })?;

    let labels = history.column("drive_label")?.str()?.clone();
    let started = history.column("started_at")?.str()?.clone();
    let ended = history.column("ended_at")?.str()?.clone();
    let status = history.column("status")?.str()?.clone();
    let files_rows = history.column("files_rows")?.i64()?.clone();
    let photos_rows = history.column("photos_rows")?.i64()?.clone();
    let videos_rows = history.column("videos_rows")?.i64()?.clone();

    // RFC 3339 strings order lexicographically, so string max picks the
    // latest run.
    let mut latest: HashMap<String, usize> = HashMap::new();
    for i in 0..history.height() {
        let Some(label) = labels.get(i) else { continue };
        let newer = match latest.get(label) {
            Some(&prev) => started.get(i) > started.get(prev),
            None => true,
        };
        if newer {
            latest.insert(label.to_string(), i);
        }
    }

    let mut rows: Vec<DriveScanSummary> = latest
        .into_iter()
        .map(|(label, i)| {
            let started_at = started.get(i).unwrap_or_default().to_string();
            let ended_at = ended.get(i).unwrap_or_default().to_string();
            let duration_s = duration_seconds(&started_at, &ended_at);
            let files = files_rows.get(i).unwrap_or(0);
            let photos = photos_rows.get(i).unwrap_or(0);
            let videos = videos_rows.get(i).unwrap_or(0);
            let total_rows = files + photos + videos;
            let rows_per_sec = duration_s
                .filter(|&d| d > 0)
                .map(|d| (total_rows as f64 / d as f64 * 100.0).round() / 100.0);
            DriveScanSummary {
                drive_label: label,
                last_started_at: started_at,
                last_ended_at: ended_at,
                status: status.get(i).unwrap_or_default().to_string(),
                files_rows: files,
                photos_rows: photos,
                videos_rows: videos,
                duration_s,
                total_rows,
                rows_per_sec,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.drive_label.cmp(&b.drive_label));
    Ok(rows)
}

fn duration_seconds(started_at: &str, ended_at: &str) -> Option<i64> {
    let start = DateTime::parse_from_rfc3339(started_at).ok()?;
    let end = DateTime::parse_from_rfc3339(ended_at).ok()?;
    Some((end - start).num_seconds())
}
