//! Core error types

use std::path::PathBuf;

use minnote_storage::StorageError;
use minnote_tabs::TabError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Session or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Content too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Failed to save {} after {attempts} attempts: {source}", .destination.display())]
    PersistFailed {
        destination: PathBuf,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("Failed to load {} after {attempts} attempts: {source}", .source_path.display())]
    RetrieveFailed {
        source_path: PathBuf,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("Tab error: {0}")]
    Tab(#[source] TabError),

    #[error("Storage error: {0}")]
    Storage(#[source] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound(_))
    }
}

impl From<TabError> for CoreError {
    fn from(err: TabError) -> Self {
        match err {
            TabError::NotFound(id) => CoreError::NotFound(format!("session {}", id)),
            other => CoreError::Tab(other),
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => CoreError::NotFound(path.display().to_string()),
            other => CoreError::Storage(other),
        }
    }
}
