pub mod batch;
pub mod category;
pub mod derived;
pub mod error;
pub mod history;
pub mod ingest;
pub mod ingest_log;
pub mod manifest;
pub mod orchestrator;
pub mod scanner;
pub mod schema;
pub mod store;
pub mod summary;
pub mod walk;

pub use category::Category;
pub use error::{CatalogueError, Result};
pub use store::CatalogueStore;
