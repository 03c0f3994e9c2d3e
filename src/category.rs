//! File categories tracked by the catalogue and their extension tables.

use lazy_static::lazy_static;
use std::collections::HashSet;

/// One scan category. Each category has its own raw relation and derived view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Files,
    Photos,
    Videos,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Files, Category::Photos, Category::Videos];

    /// Filename prefix that routes a batch CSV to this category.
    pub fn batch_prefix(&self) -> &'static str {
        match self {
            Category::Files => "files_",
            Category::Photos => "photos_",
            Category::Videos => "videos_",
        }
    }

    /// Name of the append-only raw relation in the store.
    pub fn raw_relation(&self) -> &'static str {
        match self {
            Category::Files => "files_raw",
            Category::Photos => "photos_raw",
            Category::Videos => "videos_raw",
        }
    }

    /// Name of the derived view built over the raw relation.
    pub fn view_name(&self) -> &'static str {
        match self {
            Category::Files => "files",
            Category::Photos => "photos",
            Category::Videos => "videos",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.view_name())
    }
}

lazy_static! {
    pub static ref PHOTO_EXTENSIONS: HashSet<&'static str> = [
        "arw", "arq", "srx", "sr2", "cr2", "raf", "nef", "dng", "jpg", "jpeg", "tiff", "tif",
        "png", "heic", "heif",
    ]
    .into_iter()
    .collect();
    pub static ref VIDEO_EXTENSIONS: HashSet<&'static str> = [
        "mp4", "mov", "mxf", "avi", "mpg", "mpeg", "mts", "mkv",
    ]
    .into_iter()
    .collect();
}
