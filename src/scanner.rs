//! External scan producers - the metadata-extraction collaborators.
//!
//! Scans run as blocking synchronous subprocesses with no timeout or
//! cancellation; a hung scanner blocks the pipeline indefinitely. That is a
//! documented limitation of the system, not something handled here.

use crate::category::{PHOTO_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::derived::SOURCE_FILE_COL;
use crate::error::{CatalogueError, Result};
use csv::ReaderBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Seam between the orchestrator and the shell-driven extraction scripts.
/// The full-traversal scans walk the mounted drive; the from-list variants
/// take a pre-filtered path list and skip the traversal.
pub trait ScanInvoker {
    fn scan_files(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()>;
    fn scan_photos(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()>;
    fn scan_videos(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()>;
    fn extract_photos_from_list(&self, list: &Path, label: &str, outdir: &Path) -> Result<()>;
    fn extract_videos_from_list(&self, list: &Path, label: &str, outdir: &Path) -> Result<()>;
}

/// Runs the container extraction scripts from a script directory.
pub struct CommandScanner {
    script_dir: PathBuf,
}

impl CommandScanner {
    pub fn new(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
        }
    }

    fn run(&self, script: &str, args: &[&str]) -> Result<()> {
        let program = self.script_dir.join(script);
        info!(script = %program.display(), ?args, "invoking scanner");
        let status = Command::new(&program).args(args).status()?;
        if !status.success() {
            return Err(CatalogueError::Scan(format!(
                "Scanner {} exited with {}",
                program.display(),
                status
            )));
        }
        Ok(())
    }
}

impl ScanInvoker for CommandScanner {
    fn scan_files(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.run(
            "container_scan_files.sh",
            &[
                &drive_path.display().to_string(),
                label,
                &outdir.display().to_string(),
            ],
        )
    }

    fn scan_photos(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.run(
            "container_scan_photos.sh",
            &[
                &drive_path.display().to_string(),
                label,
                &outdir.display().to_string(),
            ],
        )
    }

    fn scan_videos(&self, drive_path: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.run(
            "container_scan_videos.sh",
            &[
                &drive_path.display().to_string(),
                label,
                &outdir.display().to_string(),
            ],
        )
    }

    fn extract_photos_from_list(&self, list: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.run(
            "container_extract_photos_from_list.sh",
            &[
                &list.display().to_string(),
                label,
                &outdir.display().to_string(),
            ],
        )
    }

    fn extract_videos_from_list(&self, list: &Path, label: &str, outdir: &Path) -> Result<()> {
        self.run(
            "container_extract_videos_from_list.sh",
            &[
                &list.display().to_string(),
                label,
                &outdir.display().to_string(),
            ],
        )
    }
}

/// Paths of the photo/video list files derived from a files batch.
#[derive(Debug)]
pub struct MediaLists {
    pub photos: PathBuf,
    pub videos: PathBuf,
}

/// Split a files-category batch into photo and video path lists by
/// extension, so the media scans can skip a second full traversal.
pub fn derive_media_lists(files_csv: &Path, outdir: &Path) -> Result<MediaLists> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(files_csv)?;
    let source_idx = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == SOURCE_FILE_COL)
        .ok_or_else(|| {
            CatalogueError::Scan(format!(
                "No {SOURCE_FILE_COL} column in {}",
                files_csv.display()
            ))
        })?;

    let photos_path = outdir.join("photos_list.txt");
    let videos_path = outdir.join("videos_list.txt");
    let mut photos = std::io::BufWriter::new(std::fs::File::create(&photos_path)?);
    let mut videos = std::io::BufWriter::new(std::fs::File::create(&videos_path)?);

    for record in reader.records() {
        let record = record?;
        let Some(source) = record.get(source_idx).map(str::trim) else {
            continue;
        };
        if source.is_empty() {
            continue;
        }
        let ext = source
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();
        if PHOTO_EXTENSIONS.contains(ext.as_str()) {
            writeln!(photos, "{source}")?;
        } else if VIDEO_EXTENSIONS.contains(ext.as_str()) {
            writeln!(videos, "{source}")?;
        }
    }
    photos.flush()?;
    videos.flush()?;

    Ok(MediaLists {
        photos: photos_path,
        videos: videos_path,
    })
}
