use metacat_core::TableRef;
use thiserror::Error;

/// Errors produced by [`CatalogStore`](super::CatalogStore) operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table {0} is already registered")]
    DuplicateTable(TableRef),
    #[error("table {0} not found")]
    TableNotFound(TableRef),
    #[error("database {cluster}.{database} not found")]
    DatabaseNotFound { cluster: String, database: String },
    #[error("cluster {0} not found")]
    ClusterNotFound(String),
    #[error("database {cluster}.{database} already exists")]
    DatabaseAlreadyExists { cluster: String, database: String },
    #[error("cluster {0} already exists")]
    ClusterAlreadyExists(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
