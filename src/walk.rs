//! Local directory walker - fallback files-category scan producer.
//!
//! Stands in for the external extraction tool when only names and sizes are
//! needed: walks a mounted drive and writes a files batch CSV with the same
//! routing prefix and core columns the shell scanners produce.

use crate::error::{CatalogueError, Result};
use crate::derived::{FILE_SIZE_COL, SOURCE_FILE_COL};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Walk `root` and write a `files_<timestamp>.csv` batch into `outdir`.
/// Files whose metadata cannot be read are skipped, not fatal.
pub fn scan_to_csv(root: &Path, outdir: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(CatalogueError::NotFound(format!(
            "Path not found: {}",
            root.display()
        )));
    }
    std::fs::create_dir_all(outdir)?;
    let out_path = outdir.join(format!(
        "files_{}.csv",
        Utc::now().format("%Y-%m-%dT%H%M%S")
    ));

    let mut writer = csv::Writer::from_path(&out_path)?;
    writer.write_record([SOURCE_FILE_COL, "FileName", "Directory", FILE_SIZE_COL])?;

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => {
                warn!(path = %entry.path().display(), %err, "skipping unreadable file");
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let directory = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        writer.write_record([
            path.display().to_string().as_str(),
            name.as_ref(),
            directory.as_str(),
            size.to_string().as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(out_path)
}
