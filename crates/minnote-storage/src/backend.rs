//! Storage collaborator contract

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::Result;

/// Reads and writes note contents by destination path.
///
/// Implementations own all file-system semantics (atomicity, locking).
/// Callers only distinguish a missing file (`StorageError::NotFound`) from
/// failures worth retrying (see `StorageError::is_transient`).
#[async_trait]
pub trait NoteStorage: Send + Sync {
    /// Read the full contents stored at `path`.
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Replace the contents stored at `path`.
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Root directory that relative destinations are resolved against.
    fn storage_root(&self) -> PathBuf;
}
