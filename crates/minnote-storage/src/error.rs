//! Storage error types

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not valid UTF-8 text: {}", .0.display())]
    InvalidEncoding(PathBuf),

    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether retrying the same operation could succeed.
    ///
    /// Missing files, bad encodings and permission problems fail the same
    /// way on every attempt, so they are never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::Io(e) => !matches!(
                e.kind(),
                ErrorKind::NotFound
                    | ErrorKind::InvalidData
                    | ErrorKind::PermissionDenied
                    | ErrorKind::IsADirectory
            ),
            StorageError::Transient(_) => true,
            StorageError::NotFound(_)
            | StorageError::InvalidEncoding(_)
            | StorageError::Database(_)
            | StorageError::Json(_) => false,
        }
    }
}
