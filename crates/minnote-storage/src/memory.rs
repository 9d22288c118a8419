//! In-memory note storage
//!
//! Backs the editor when no disk is wanted (tests, scratch workspaces) and
//! can inject transient failures to exercise retry handling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::NoteStorage;
use crate::error::StorageError;
use crate::Result;

#[derive(Debug, Default)]
struct MemoryInner {
    files: HashMap<PathBuf, String>,
    failing_writes: usize,
    failing_reads: usize,
    write_attempts: usize,
    read_attempts: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
    root: PathBuf,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryInner::default())),
            root: PathBuf::from("/memory"),
        }
    }

    /// Make the next `count` writes fail with a transient error
    pub fn fail_next_writes(&self, count: usize) {
        self.inner.lock().failing_writes = count;
    }

    /// Make the next `count` reads fail with a transient error
    pub fn fail_next_reads(&self, count: usize) {
        self.inner.lock().failing_reads = count;
    }

    /// Number of write attempts seen, failed ones included
    pub fn write_attempts(&self) -> usize {
        self.inner.lock().write_attempts
    }

    /// Number of read attempts seen, failed ones included
    pub fn read_attempts(&self) -> usize {
        self.inner.lock().read_attempts
    }

    /// Store contents directly, bypassing failure injection
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.inner.lock().files.insert(path.into(), content.into());
    }

    /// Current contents at `path`, bypassing failure injection
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.inner.lock().files.get(path).cloned()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStorage for MemoryStorage {
    async fn read_file(&self, path: &Path) -> Result<String> {
        let mut inner = self.inner.lock();
        inner.read_attempts += 1;

        if inner.failing_reads > 0 {
            inner.failing_reads -= 1;
            return Err(StorageError::Transient(format!(
                "simulated read failure for {}",
                path.display()
            )));
        }

        inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.write_attempts += 1;

        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(StorageError::Transient(format!(
                "simulated write failure for {}",
                path.display()
            )));
        }

        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn storage_root(&self) -> PathBuf {
        self.root.clone()
    }
}
