//! Derived view builder - stable identifiers computed over raw relations.
//!
//! Views are pure projections: recomputed from the current raw relation on
//! every call, never cached, safe to rebuild at any time. Each view adds
//! Drive, RelativePath, RelativeDirectory, FileExt and FileKey on top of
//! whatever columns the raw relation carries.
//!
//! FileKey is an identity key, not a content hash: XxHash64 (seed 0) over
//! Drive, RelativePath and FileSize in exactly that order, with a 0x00
//! separator between the string fields and the size as 8 little-endian
//! bytes. The algorithm is pinned so the value reproduces identically
//! across rebuilds.

use crate::category::Category;
use crate::error::{CatalogueError, Result};
use crate::store::CatalogueStore;
use polars::prelude::*;
use regex::Regex;
use std::hash::Hasher;
use twox_hash::XxHash64;

pub const DEFAULT_SCAN_ROOT: &str = "/host/Volumes";

/// Column the external scanner writes the full path into.
pub const SOURCE_FILE_COL: &str = "SourceFile";
/// Numeric byte-size column from the scanner (`-n` convention).
pub const FILE_SIZE_COL: &str = "FileSize#";

pub struct DerivedViewBuilder {
    root: String,
    drive_re: Regex,
}

impl DerivedViewBuilder {
    pub fn new(scan_root: &str) -> Result<Self> {
        let root = scan_root.trim_end_matches('/').to_string();
        let drive_re = Regex::new(&format!("^{}/([^/]+)/", regex::escape(&root)))?;
        Ok(Self { root, drive_re })
    }

    pub fn with_default_root() -> Result<Self> {
        Self::new(DEFAULT_SCAN_ROOT)
    }

    pub fn scan_root(&self) -> &str {
        &self.root
    }

    /// Drive label of a source path, if the path sits under the scan root.
    pub fn drive_of<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.drive_re
            .captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Decompose a source path into (Drive, RelativePath).
    pub fn split_source<'s>(&self, source: &'s str) -> Option<(&'s str, &'s str)> {
        let rest = source.strip_prefix(&self.root)?.strip_prefix('/')?;
        rest.split_once('/')
    }

    /// Pinned identity hash over (Drive, RelativePath, FileSize).
    pub fn file_key(drive: &str, relative_path: &str, file_size: u64) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(drive.as_bytes());
        hasher.write(&[0u8]);
        hasher.write(relative_path.as_bytes());
        hasher.write(&[0u8]);
        hasher.write(&file_size.to_le_bytes());
        hasher.finish()
    }

    /// Recompute the derived view for one category from the raw relation.
    pub fn view(&self, store: &CatalogueStore, category: Category) -> Result<DataFrame> {
        let raw = store
            .read_relation(category.raw_relation())?
            .ok_or_else(|| {
                CatalogueError::NotFound(format!(
                    "Raw relation not found: {}",
                    category.raw_relation()
                ))
            })?;

        let height = raw.height();
        let sources = raw.column(SOURCE_FILE_COL)?.str()?.clone();
        let sizes: Vec<Option<i64>> = match raw.column(FILE_SIZE_COL) {
            Ok(s) => s.cast(&DataType::Int64)?.i64()?.into_iter().collect(),
            Err(_) => vec![None; height],
        };

        let mut drives: Vec<Option<String>> = Vec::with_capacity(height);
        let mut rel_paths: Vec<Option<String>> = Vec::with_capacity(height);
        let mut rel_dirs: Vec<Option<String>> = Vec::with_capacity(height);
        let mut exts: Vec<Option<String>> = Vec::with_capacity(height);
        let mut keys: Vec<Option<u64>> = Vec::with_capacity(height);

        for (source, size) in sources.into_iter().zip(sizes) {
            let parts = source.and_then(|s| self.split_source(s));
            match parts {
                Some((drive, rel)) => {
                    drives.push(Some(drive.to_string()));
                    rel_paths.push(Some(rel.to_string()));
                    rel_dirs.push(Some(relative_directory(rel).to_string()));
                    exts.push(Some(file_ext(rel)));
                    keys.push(size.map(|sz| Self::file_key(drive, rel, sz as u64)));
                }
                None => {
                    drives.push(None);
                    rel_paths.push(None);
                    rel_dirs.push(None);
                    exts.push(None);
                    keys.push(None);
                }
            }
        }

        let mut view = raw;
        view.with_column(Series::new("Drive", drives))?;
        view.with_column(Series::new("RelativePath", rel_paths))?;
        view.with_column(Series::new("RelativeDirectory", rel_dirs))?;
        view.with_column(Series::new("FileExt", exts))?;
        view.with_column(Series::new("FileKey", keys))?;
        Ok(view)
    }
}

/// Directory portion of a relative path; empty when the file sits at the
/// drive root.
fn relative_directory(relative_path: &str) -> &str {
    match relative_path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => "",
    }
}

/// Lowercase suffix after the last dot of the file name; empty if none.
fn file_ext(relative_path: &str) -> String {
    let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}
