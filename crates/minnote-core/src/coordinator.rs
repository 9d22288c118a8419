//! Save/Load Coordinator
//!
//! Every storage call goes through here: size limits, destination
//! resolution, retries, and reconciling the cache and session state once
//! a call completes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minnote_cache::CacheKey;
use minnote_storage::NoteStorage;
use minnote_tabs::{SessionId, SessionStore, TabError};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::CoreError;
use crate::events::WorkspaceEvent;
use crate::prompt::UserPrompts;
use crate::retry::{RetryError, RetryPolicy};
use crate::Result;

/// Whether a save may ask the user for a destination, and whether it may
/// move the session to a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Never prompts; a session without a destination is left dirty
    Autosave,
    /// Prompts for a destination when none is known
    Explicit,
    /// Replaces the established destination; prompts when none is given
    SaveAs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Written to `destination`. `clean` is false if the session changed
    /// while the write was in flight (or was closed meanwhile).
    Saved { destination: PathBuf, clean: bool },
    /// Nothing to do: no destination for an autosave, or a read-only view
    Skipped,
    /// The user cancelled the destination dialog
    Cancelled,
}

#[derive(Clone)]
pub struct SaveLoadCoordinator {
    store: Arc<Mutex<SessionStore>>,
    storage: Arc<dyn NoteStorage>,
    prompts: Arc<dyn UserPrompts>,
    retry: RetryPolicy,
    max_content_bytes: usize,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl SaveLoadCoordinator {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        storage: Arc<dyn NoteStorage>,
        prompts: Arc<dyn UserPrompts>,
        retry: RetryPolicy,
        max_content_bytes: usize,
        events: broadcast::Sender<WorkspaceEvent>,
    ) -> Self {
        Self {
            store,
            storage,
            prompts,
            retry,
            max_content_bytes,
            events,
        }
    }

    pub fn storage(&self) -> &Arc<dyn NoteStorage> {
        &self.storage
    }

    fn check_size(&self, content: &str) -> Result<()> {
        if content.len() > self.max_content_bytes {
            return Err(CoreError::TooLarge {
                size: content.len(),
                limit: self.max_content_bytes,
            });
        }
        Ok(())
    }

    /// Absolute form of `path`; relative paths live under the storage root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.storage.storage_root().join(path)
        }
    }

    /// Persist `content` for a session.
    ///
    /// Only `SaveMode::SaveAs` may move a session off its established
    /// destination; a different `destination` passed in any other mode is
    /// ignored. Without any destination, `mode` decides between skipping
    /// and asking.
    pub async fn persist(
        &self,
        id: &SessionId,
        content: &str,
        destination: Option<PathBuf>,
        mode: SaveMode,
    ) -> Result<PersistOutcome> {
        self.check_size(content)?;

        let (current_destination, title, read_only) = {
            let store = self.store.lock();
            let session = store.get(id)?;
            (
                session.file_path.clone(),
                session.title.clone(),
                session.kind.is_read_only(),
            )
        };

        if read_only {
            return Ok(PersistOutcome::Skipped);
        }

        let requested = destination.map(|path| self.resolve_path(&path));
        let chosen = match (mode, requested, current_destination) {
            (SaveMode::SaveAs, requested, _) => requested,
            (_, Some(requested), Some(current)) if requested != current => {
                tracing::warn!(
                    session_id = %id,
                    requested = %requested.display(),
                    current = %current.display(),
                    "Ignoring destination change outside Save As"
                );
                Some(current)
            }
            (_, requested, current) => requested.or(current),
        };

        let destination = match chosen {
            Some(path) => path,
            None => match mode {
                SaveMode::Autosave => {
                    tracing::debug!(session_id = %id, "No destination yet, skipping autosave");
                    return Ok(PersistOutcome::Skipped);
                }
                SaveMode::Explicit | SaveMode::SaveAs => {
                    match self.prompts.choose_save_destination(&title).await {
                        Some(path) => self.resolve_path(&path),
                        None => {
                            tracing::debug!(session_id = %id, "Save destination dialog cancelled");
                            return Ok(PersistOutcome::Cancelled);
                        }
                    }
                }
            },
        };

        if let Err(e) = self.write_with_retry(&destination, content).await {
            let _ = self.events.send(WorkspaceEvent::SaveFailed {
                id: id.clone(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        let clean = {
            let mut store = self.store.lock();
            match store.mark_saved(id, &destination, content) {
                Ok(clean) => {
                    store
                        .cache_mut()
                        .put(CacheKey::path(destination.clone()), content.to_string());
                    clean
                }
                // Removal already dropped the session's cache entries
                Err(TabError::NotFound(_)) => {
                    tracing::debug!(session_id = %id, "Session closed before save completed");
                    false
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            session_id = %id,
            destination = %destination.display(),
            bytes = content.len(),
            clean,
            "Saved note"
        );
        let _ = self.events.send(WorkspaceEvent::Saved {
            id: id.clone(),
            destination: destination.clone(),
        });

        Ok(PersistOutcome::Saved { destination, clean })
    }

    /// Load the contents stored at `source`, preferring a fresh cache entry
    pub async fn retrieve(&self, source: &Path) -> Result<String> {
        let resolved = self.resolve_path(source);
        let source = resolved.as_path();
        let key = CacheKey::path(source);
        let cached = self.store.lock().cache().get(&key);
        if let Some(cached) = cached {
            tracing::debug!(source = %source.display(), "Serving note from cache");
            return Ok(cached);
        }

        let storage = self.storage.as_ref();
        let content = self
            .retry
            .run("read", source, move || storage.read_file(source))
            .await
            .map_err(|e| match e {
                RetryError::Permanent(e) => CoreError::from(e),
                RetryError::Exhausted { attempts, last } => CoreError::RetrieveFailed {
                    source_path: source.to_path_buf(),
                    attempts,
                    source: last,
                },
            })?;

        self.check_size(&content)?;

        self.store.lock().cache_mut().put(key, content.clone());

        Ok(content)
    }

    async fn write_with_retry(&self, destination: &Path, content: &str) -> Result<()> {
        let storage = self.storage.as_ref();
        self.retry
            .run("write", destination, move || {
                storage.write_file(destination, content)
            })
            .await
            .map_err(|e| match e {
                RetryError::Permanent(e) => CoreError::from(e),
                RetryError::Exhausted { attempts, last } => CoreError::PersistFailed {
                    destination: destination.to_path_buf(),
                    attempts,
                    source: last,
                },
            })
    }

    /// Timer-driven save of a session's current content.
    ///
    /// Failures are logged and reported as events only; the session stays
    /// dirty and the next edit schedules another attempt.
    pub async fn autosave(&self, id: SessionId) {
        let content = {
            let store = self.store.lock();
            match store.get(&id) {
                Ok(session) if session.is_dirty() => session.content.clone(),
                Ok(_) => return,
                Err(_) => {
                    tracing::debug!(session_id = %id, "Session closed before autosave fired");
                    return;
                }
            }
        };

        match self.persist(&id, &content, None, SaveMode::Autosave).await {
            Ok(outcome) => {
                tracing::debug!(session_id = %id, ?outcome, "Autosave finished");
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Autosave failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minnote_cache::CacheConfig;
    use async_trait::async_trait;
    use minnote_storage::MemoryStorage;
    use minnote_tabs::{Disposition, SessionKind};
    use std::time::Duration;
    use tokio::sync::Notify;

    use crate::prompt::ScriptedPrompts;

    struct Fixture {
        store: Arc<Mutex<SessionStore>>,
        storage: MemoryStorage,
        prompts: ScriptedPrompts,
        coordinator: SaveLoadCoordinator,
    }

    fn fixture(max_content_bytes: usize) -> Fixture {
        let store = Arc::new(Mutex::new(SessionStore::new(CacheConfig {
            capacity: 8,
            expiry: Duration::from_secs(60),
        })));
        let storage = MemoryStorage::new();
        let prompts = ScriptedPrompts::new();
        let (events, _) = broadcast::channel(16);
        let coordinator = SaveLoadCoordinator::new(
            Arc::clone(&store),
            Arc::new(storage.clone()),
            Arc::new(prompts.clone()),
            RetryPolicy::default(),
            max_content_bytes,
            events,
        );
        Fixture {
            store,
            storage,
            prompts,
            coordinator,
        }
    }

    fn dirty_session(store: &Arc<Mutex<SessionStore>>, content: &str) -> SessionId {
        let mut store = store.lock();
        let id = store.create_session(SessionKind::Document).id;
        store.edit(&id, content).unwrap();
        id
    }

    #[tokio::test]
    async fn test_persist_marks_clean_and_caches() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "hello");
        let path = PathBuf::from("/notes/hello.txt");

        let outcome = f
            .coordinator
            .persist(&id, "hello", Some(path.clone()), SaveMode::Explicit)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PersistOutcome::Saved {
                destination: path.clone(),
                clean: true
            }
        );
        assert_eq!(f.storage.contents(&path).as_deref(), Some("hello"));

        let store = f.store.lock();
        let session = store.get(&id).unwrap();
        assert!(!session.is_dirty());
        assert_eq!(session.file_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            store.cache().get(&CacheKey::path(&path)).as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn test_too_large_rejected_without_io() {
        let f = fixture(4);
        let id = dirty_session(&f.store, "too long");

        let err = f
            .coordinator
            .persist(&id, "too long", Some(PathBuf::from("a.txt")), SaveMode::Explicit)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::TooLarge { size: 8, limit: 4 }));
        assert_eq!(f.storage.write_attempts(), 0);
        assert!(f.store.lock().get(&id).unwrap().is_dirty());
    }

    #[tokio::test]
    async fn test_autosave_without_destination_is_skipped() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "draft");

        let outcome = f
            .coordinator
            .persist(&id, "draft", None, SaveMode::Autosave)
            .await
            .unwrap();

        assert_eq!(outcome, PersistOutcome::Skipped);
        assert_eq!(f.storage.write_attempts(), 0);
        assert!(f.prompts.questions().is_empty());
        assert!(f.store.lock().get(&id).unwrap().is_dirty());
    }

    #[tokio::test]
    async fn test_explicit_save_asks_for_destination() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "draft");
        f.prompts.push_destination("/notes/draft.txt");

        let outcome = f
            .coordinator
            .persist(&id, "draft", None, SaveMode::Explicit)
            .await
            .unwrap();

        assert!(matches!(outcome, PersistOutcome::Saved { clean: true, .. }));
        assert_eq!(
            f.storage.contents(Path::new("/notes/draft.txt")).as_deref(),
            Some("draft")
        );
    }

    #[tokio::test]
    async fn test_explicit_save_cancelled() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "draft");

        let outcome = f
            .coordinator
            .persist(&id, "draft", None, SaveMode::Explicit)
            .await
            .unwrap();

        assert_eq!(outcome, PersistOutcome::Cancelled);
        assert!(f.store.lock().get(&id).unwrap().is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "v1");
        f.storage.fail_next_writes(2);

        let outcome = f
            .coordinator
            .persist(&id, "v1", Some(PathBuf::from("a.txt")), SaveMode::Explicit)
            .await
            .unwrap();

        assert!(matches!(outcome, PersistOutcome::Saved { clean: true, .. }));
        assert_eq!(f.storage.write_attempts(), 3);
        assert!(!f.store.lock().get(&id).unwrap().is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_transient_failures_exhaust_budget() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "v1");
        f.storage.fail_next_writes(3);

        let err = f
            .coordinator
            .persist(&id, "v1", Some(PathBuf::from("a.txt")), SaveMode::Explicit)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::PersistFailed { attempts: 3, .. }));
        assert_eq!(f.storage.write_attempts(), 3);

        let store = f.store.lock();
        assert!(store.get(&id).unwrap().is_dirty());
        assert!(store.cache().get(&CacheKey::path("/memory/a.txt")).is_none());
    }

    #[tokio::test]
    async fn test_edit_during_write_keeps_session_dirty() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "v2");

        // Persist an older snapshot than the session now holds
        let outcome = f
            .coordinator
            .persist(&id, "v1", Some(PathBuf::from("a.txt")), SaveMode::Explicit)
            .await
            .unwrap();

        assert!(matches!(outcome, PersistOutcome::Saved { clean: false, .. }));
        assert!(f.store.lock().get(&id).unwrap().is_dirty());
    }

    #[tokio::test]
    async fn test_retrieve_reads_through_cache() {
        let f = fixture(1024);
        f.storage.insert("/notes/a.txt", "stored");
        let path = Path::new("/notes/a.txt");

        assert_eq!(f.coordinator.retrieve(path).await.unwrap(), "stored");
        assert_eq!(f.coordinator.retrieve(path).await.unwrap(), "stored");
        assert_eq!(f.storage.read_attempts(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_missing_file_not_retried() {
        let f = fixture(1024);

        let err = f
            .coordinator
            .retrieve(Path::new("/notes/missing.txt"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(f.storage.read_attempts(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_rejects_oversized_content() {
        let f = fixture(4);
        f.storage.insert("/notes/big.txt", "0123456789");

        let err = f
            .coordinator
            .retrieve(Path::new("/notes/big.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::TooLarge { size: 10, limit: 4 }));
        assert_eq!(f.storage.read_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieve_exhausts_budget() {
        let f = fixture(1024);
        f.storage.insert("/notes/a.txt", "stored");
        f.storage.fail_next_reads(3);

        let err = f
            .coordinator
            .retrieve(Path::new("/notes/a.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::RetrieveFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_persist_settings_view_is_skipped() {
        let f = fixture(1024);
        let id = f.store.lock().create_session(SessionKind::SettingsView).id;

        let outcome = f
            .coordinator
            .persist(&id, "", Some(PathBuf::from("s.txt")), SaveMode::Explicit)
            .await
            .unwrap();

        assert_eq!(outcome, PersistOutcome::Skipped);
        assert_eq!(f.storage.write_attempts(), 0);
    }

    /// Holds every write open until the test releases it
    struct GatedStorage {
        inner: MemoryStorage,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl NoteStorage for GatedStorage {
        async fn read_file(&self, path: &Path) -> minnote_storage::Result<String> {
            self.inner.read_file(path).await
        }

        async fn write_file(&self, path: &Path, content: &str) -> minnote_storage::Result<()> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.write_file(path, content).await
        }

        fn storage_root(&self) -> PathBuf {
            self.inner.storage_root()
        }
    }

    #[tokio::test]
    async fn test_write_finishing_after_discard_leaves_no_cache_entry() {
        let storage = MemoryStorage::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(Mutex::new(SessionStore::default()));
        let (events, _) = broadcast::channel(16);
        let coordinator = SaveLoadCoordinator::new(
            Arc::clone(&store),
            Arc::new(GatedStorage {
                inner: storage.clone(),
                entered: Arc::clone(&entered),
                release: Arc::clone(&release),
            }),
            Arc::new(ScriptedPrompts::new()),
            RetryPolicy::default(),
            1024,
            events,
        );
        let id = dirty_session(&store, "draft");
        let path = PathBuf::from("/notes/a.txt");

        let save = {
            let coordinator = coordinator.clone();
            let id = id.clone();
            let path = path.clone();
            tokio::spawn(async move {
                coordinator
                    .persist(&id, "draft", Some(path), SaveMode::Explicit)
                    .await
            })
        };

        entered.notified().await;
        {
            let mut store = store.lock();
            store.close(&id).unwrap();
            store.resolve_close(&id, Disposition::Discarded).unwrap();
        }
        release.notify_one();

        let outcome = save.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            PersistOutcome::Saved {
                destination: path.clone(),
                clean: false
            }
        );
        assert_eq!(storage.contents(&path).as_deref(), Some("draft"));

        let store = store.lock();
        assert!(store.is_empty());
        assert!(store.cache().get(&CacheKey::path(&path)).is_none());
        assert!(store.cache().is_empty());
    }

    #[tokio::test]
    async fn test_plain_save_keeps_established_destination() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "v1");
        let home = PathBuf::from("/notes/home.txt");
        let elsewhere = PathBuf::from("/notes/elsewhere.txt");
        f.coordinator
            .persist(&id, "v1", Some(home.clone()), SaveMode::Explicit)
            .await
            .unwrap();

        f.store.lock().edit(&id, "v2").unwrap();
        let outcome = f
            .coordinator
            .persist(&id, "v2", Some(elsewhere.clone()), SaveMode::Explicit)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PersistOutcome::Saved {
                destination: home.clone(),
                clean: true
            }
        );
        assert_eq!(f.storage.contents(&home).as_deref(), Some("v2"));
        assert_eq!(f.storage.contents(&elsewhere), None);
        assert_eq!(
            f.store.lock().get(&id).unwrap().file_path.as_deref(),
            Some(home.as_path())
        );
    }

    #[tokio::test]
    async fn test_save_as_moves_destination() {
        let f = fixture(1024);
        let id = dirty_session(&f.store, "v1");
        f.coordinator
            .persist(&id, "v1", Some(PathBuf::from("/notes/old.txt")), SaveMode::Explicit)
            .await
            .unwrap();
        f.prompts.push_destination("/notes/new.txt");

        let outcome = f
            .coordinator
            .persist(&id, "v1", None, SaveMode::SaveAs)
            .await
            .unwrap();

        assert!(matches!(outcome, PersistOutcome::Saved { clean: true, .. }));
        let store = f.store.lock();
        let session = store.get(&id).unwrap();
        assert_eq!(session.file_path.as_deref(), Some(Path::new("/notes/new.txt")));
        assert_eq!(session.title, "new.txt");
    }

    #[tokio::test]
    async fn test_relative_and_absolute_paths_share_cache_entry() {
        let f = fixture(1024);
        f.storage.insert("/memory/notes/a.txt", "stored");

        assert_eq!(
            f.coordinator.retrieve(Path::new("notes/a.txt")).await.unwrap(),
            "stored"
        );
        assert_eq!(
            f.coordinator
                .retrieve(Path::new("/memory/notes/a.txt"))
                .await
                .unwrap(),
            "stored"
        );
        assert_eq!(f.storage.read_attempts(), 1);
        assert_eq!(
            f.coordinator.resolve_path(Path::new("notes/a.txt")),
            PathBuf::from("/memory/notes/a.txt")
        );
    }
}
