//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage quota exceeded for scope {scope}: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        scope: String,
        needed: usize,
        quota: usize,
    },
}
