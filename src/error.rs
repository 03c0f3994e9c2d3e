use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogueError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Scan error: {0}")]
    Scan(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogueError>;
