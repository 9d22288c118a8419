//! File-system note storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::backend::NoteStorage;
use crate::error::StorageError;
use crate::Result;

/// Stores notes as plain UTF-8 files below a configured root.
///
/// Absolute destinations are used as given; relative ones are resolved
/// against the root.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl NoteStorage for FsStorage {
    async fn read_file(&self, path: &Path) -> Result<String> {
        let full_path = self.resolve(path);
        let bytes = match tokio::fs::read(&full_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(full_path));
            }
            Err(e) => return Err(e.into()),
        };

        String::from_utf8(bytes).map_err(|_| StorageError::InvalidEncoding(full_path))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, content).await?;

        tracing::debug!(path = %full_path.display(), bytes = content.len(), "Wrote note file");

        Ok(())
    }

    fn storage_root(&self) -> PathBuf {
        self.root.clone()
    }
}
