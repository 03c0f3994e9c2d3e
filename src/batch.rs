//! Batch discovery - deterministic listing of new scan CSVs.

use crate::category::Category;
use crate::error::{CatalogueError, Result};
use crate::ingest_log::IngestionLog;
use itertools::Itertools;
use std::path::{Path, PathBuf};

/// All `<prefix>*.csv` files in `directory`, lexicographically sorted.
/// Files only; subdirectories are ignored.
pub fn list_batches(directory: &Path, category: Category) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(CatalogueError::NotFound(format!(
            "Batch directory not found: {}",
            directory.display()
        )));
    }
    let prefix = category.batch_prefix();
    let batches = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(prefix) && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .sorted()
        .collect();
    Ok(batches)
}

/// Batches not yet recorded in the ingestion log, in processing order.
pub fn list_new_batches(
    directory: &Path,
    category: Category,
    log: &IngestionLog,
) -> Result<Vec<PathBuf>> {
    let ingested = log.ingested_paths()?;
    Ok(list_batches(directory, category)?
        .into_iter()
        .filter(|p| !ingested.contains(&p.display().to_string()))
        .collect())
}

/// Most recent batch for a category, by lexicographic (timestamp) order.
pub fn latest_batch(directory: &Path, category: Category) -> Option<PathBuf> {
    list_batches(directory, category)
        .ok()
        .and_then(|b| b.into_iter().last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_listing_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photos_2024-02-01.csv"), "SourceFile\n").unwrap();
        fs::write(dir.path().join("photos_2024-01-01.csv"), "SourceFile\n").unwrap();
        fs::write(dir.path().join("videos_2024-01-01.csv"), "SourceFile\n").unwrap();
        fs::write(dir.path().join("photos_list.txt"), "").unwrap();
        fs::create_dir(dir.path().join("photos_nested.csv")).unwrap();

        let batches = list_batches(dir.path(), Category::Photos).unwrap();
        let names: Vec<_> = batches
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["photos_2024-01-01.csv", "photos_2024-02-01.csv"]);
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let err = list_batches(Path::new("/unlikely/to/exist/___out___"), Category::Files)
            .unwrap_err();
        assert!(matches!(err, CatalogueError::NotFound(_)));
    }

    #[test]
    fn test_latest_batch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("files_2024-01-01.csv"), "SourceFile\n").unwrap();
        fs::write(dir.path().join("files_2024-03-01.csv"), "SourceFile\n").unwrap();
        let latest = latest_batch(dir.path(), Category::Files).unwrap();
        assert!(latest.ends_with("files_2024-03-01.csv"));
    }
}
