//! Editor workspace
//!
//! The single owner of editor state. UI events (edit, switch, open, save,
//! close) come in here; the workspace holds the session store behind one
//! lock and hands storage work to the coordinator.

use std::path::PathBuf;
use std::sync::Arc;

use minnote_storage::{
    Database, EditorSettings, FsStorage, NoteStorage, SettingsStore,
};
use minnote_tabs::{Activation, Session, SessionId, SessionKind, SessionStore};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::autosave::AutosavePolicy;
use crate::close_flow::{CloseConfirmationFlow, CloseOutcome};
use crate::config::Config;
use crate::coordinator::{PersistOutcome, SaveLoadCoordinator, SaveMode};
use crate::events::WorkspaceEvent;
use crate::prompt::UserPrompts;
use crate::Result;

const OPEN_FILES_KEY: &str = "open_files";
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The note is open and active; `content` is what to display
    Opened { session: Session, content: String },
    /// The user cancelled the open dialog
    Cancelled,
}

#[derive(Clone)]
pub struct Workspace {
    config: Config,
    store: Arc<Mutex<SessionStore>>,
    coordinator: SaveLoadCoordinator,
    autosave: AutosavePolicy,
    close_flow: CloseConfirmationFlow,
    prompts: Arc<dyn UserPrompts>,
    settings: Option<SettingsStore>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl Workspace {
    /// Build a workspace over explicit collaborators, without settings
    pub fn new(
        config: Config,
        storage: Arc<dyn NoteStorage>,
        prompts: Arc<dyn UserPrompts>,
    ) -> Self {
        let store = Arc::new(Mutex::new(SessionStore::new(config.cache_config())));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let coordinator = SaveLoadCoordinator::new(
            Arc::clone(&store),
            storage,
            Arc::clone(&prompts),
            config.retry_policy(),
            config.max_content_bytes,
            events.clone(),
        );
        let close_flow = CloseConfirmationFlow::new(
            Arc::clone(&store),
            coordinator.clone(),
            Arc::clone(&prompts),
        );

        Self {
            autosave: AutosavePolicy::new(config.autosave_delay),
            config,
            store,
            coordinator,
            close_flow,
            prompts,
            settings: None,
            events,
        }
    }

    /// Attach a settings store used for restoring open files
    pub fn with_settings(mut self, settings: SettingsStore) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build a file-backed workspace from configuration.
    ///
    /// Opens the settings database and stores notes under the storage root
    /// from the settings, falling back to `config.storage_root`.
    pub fn from_config(config: Config, prompts: Arc<dyn UserPrompts>) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let settings = SettingsStore::new(Database::open(&config.database_path)?);
        let storage_root = EditorSettings::load(&settings)?
            .storage_root
            .unwrap_or_else(|| config.storage_root.clone());

        tracing::info!(storage_root = %storage_root.display(), "Using note storage root");

        let storage = Arc::new(FsStorage::new(storage_root));
        Ok(Self::new(config, storage, prompts).with_settings(settings))
    }

    /// Restore the notes that were open at the last `dispose`, or start
    /// with one empty note.
    pub async fn init(&self) -> Result<()> {
        let restore: Vec<PathBuf> = match &self.settings {
            Some(settings) => settings.get_json(OPEN_FILES_KEY)?.unwrap_or_default(),
            None => Vec::new(),
        };

        for path in restore {
            if let Err(e) = self.open(Some(path.clone()), None).await {
                tracing::warn!(path = %path.display(), error = %e, "Could not restore note");
            }
        }

        if self.store.lock().is_empty() {
            self.new_note(None)?;
        }

        // Restored notes open in order; start on the first one
        let first = self.store.lock().list_ordered().first().map(|s| s.id.clone());
        if let Some(first) = first {
            self.activate(&first, None)?;
        }

        tracing::info!(sessions = self.store.lock().len(), "Workspace initialized");

        Ok(())
    }

    /// Tear down: stop pending autosaves, remember open files, drop state.
    ///
    /// Unsaved edits are not written; callers close dirty sessions first.
    pub fn dispose(&self) -> Result<()> {
        self.autosave.cancel_all();

        let open_files: Vec<PathBuf> = self
            .store
            .lock()
            .list_ordered()
            .iter()
            .filter(|s| s.kind == SessionKind::Document)
            .filter_map(|s| s.file_path.clone())
            .collect();

        if let Some(settings) = &self.settings {
            settings.set_json(OPEN_FILES_KEY, &open_files)?;
        }

        self.store.lock().clear();

        tracing::info!(remembered = open_files.len(), "Workspace disposed");

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> Option<&SettingsStore> {
        self.settings.as_ref()
    }

    /// Persisted editor settings, or defaults without a settings store
    pub fn editor_settings(&self) -> Result<EditorSettings> {
        match &self.settings {
            Some(settings) => Ok(EditorSettings::load(settings)?),
            None => Ok(EditorSettings::default()),
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        self.coordinator.storage().storage_root()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    pub fn coordinator(&self) -> &SaveLoadCoordinator {
        &self.coordinator
    }

    pub fn autosave(&self) -> &AutosavePolicy {
        &self.autosave
    }

    // === Session queries ===

    /// Open sessions in creation order
    pub fn sessions(&self) -> Vec<Session> {
        self.store
            .lock()
            .list_ordered()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn session(&self, id: &SessionId) -> Result<Session> {
        Ok(self.store.lock().get(id)?.clone())
    }

    pub fn active_session(&self) -> Option<Session> {
        self.store.lock().active_session().cloned()
    }

    // === Session operations ===

    /// Create an empty note and make it active.
    ///
    /// `live_buffer` is the outgoing editor buffer, flushed as on any switch.
    pub fn new_note(&self, live_buffer: Option<&str>) -> Result<Session> {
        let (session, activation) = {
            let mut store = self.store.lock();
            // Nothing shown yet means no outgoing buffer
            let live_buffer = live_buffer.filter(|_| store.active_id().is_some());
            let session = store.create_session(SessionKind::Document);
            let activation = store.activate(&session.id, live_buffer)?;
            (session, activation)
        };
        self.after_switch(&activation);
        Ok(session)
    }

    /// Show the settings view, reusing an open one
    pub fn open_settings(&self, live_buffer: Option<&str>) -> Result<Session> {
        let (session, activation) = {
            let mut store = self.store.lock();
            let live_buffer = live_buffer.filter(|_| store.active_id().is_some());
            let session = match store.find_by_kind(SessionKind::SettingsView) {
                Some(existing) => existing.clone(),
                None => store.create_session(SessionKind::SettingsView),
            };
            let activation = store.activate(&session.id, live_buffer)?;
            (session, activation)
        };
        self.after_switch(&activation);
        Ok(session)
    }

    /// Switch tabs, flushing the outgoing editor buffer first
    pub fn activate(&self, id: &SessionId, live_buffer: Option<&str>) -> Result<Activation> {
        let activation = self.store.lock().activate(id, live_buffer)?;
        self.after_switch(&activation);
        Ok(activation)
    }

    fn after_switch(&self, activation: &Activation) {
        if let Some(flushed) = &activation.flushed {
            self.schedule_autosave(flushed.clone());
        }
    }

    /// Apply an edit and restart the session's autosave timer
    pub fn edit(&self, id: &SessionId, content: &str) -> Result<bool> {
        let char_count = {
            let mut store = self.store.lock();
            if !store.edit(id, content)? {
                return Ok(false);
            }
            store.get(id)?.char_count()
        };

        let _ = self.events.send(WorkspaceEvent::Edited {
            id: id.clone(),
            char_count,
        });
        self.schedule_autosave(id.clone());

        Ok(true)
    }

    fn schedule_autosave(&self, id: SessionId) {
        let coordinator = self.coordinator.clone();
        self.autosave.on_edit(id, move |id| async move {
            coordinator.autosave(id).await;
        });
    }

    /// Open a note, asking for a file when no path is given.
    ///
    /// A note that is already open is activated instead of opened twice.
    /// `live_buffer` is the outgoing editor buffer, flushed on the switch.
    pub async fn open(
        &self,
        path: Option<PathBuf>,
        live_buffer: Option<&str>,
    ) -> Result<OpenOutcome> {
        let path = match path {
            Some(path) => path,
            None => match self.prompts.choose_open_source().await {
                Some(path) => path,
                None => return Ok(OpenOutcome::Cancelled),
            },
        };
        let path = self.coordinator.resolve_path(&path);

        let existing = self.store.lock().find_by_path(&path).cloned();
        if let Some(session) = existing {
            let activation = self.activate(&session.id, live_buffer)?;
            return Ok(OpenOutcome::Opened {
                session,
                content: activation.content,
            });
        }

        let content = self.coordinator.retrieve(&path).await?;

        let (session, activation) = {
            let mut store = self.store.lock();
            let live_buffer = live_buffer.filter(|_| store.active_id().is_some());
            let session = store.open_document(&path, content);
            let activation = store.activate(&session.id, live_buffer)?;
            (session, activation)
        };
        self.after_switch(&activation);

        tracing::info!(session_id = %session.id, path = %path.display(), "Opened note");
        let _ = self.events.send(WorkspaceEvent::Loaded {
            id: session.id.clone(),
            source: path,
        });

        let content = session.content.clone();
        Ok(OpenOutcome::Opened { session, content })
    }

    /// Save to the known destination, asking for one if there is none
    pub async fn save(&self, id: &SessionId) -> Result<PersistOutcome> {
        let content = self.store.lock().get(id)?.content.clone();
        self.coordinator
            .persist(id, &content, None, SaveMode::Explicit)
            .await
    }

    /// Save to a newly chosen destination, which replaces the current one
    pub async fn save_as(&self, id: &SessionId) -> Result<PersistOutcome> {
        let (content, title) = {
            let store = self.store.lock();
            let session = store.get(id)?;
            (session.content.clone(), session.title.clone())
        };

        let destination = match self.prompts.choose_save_destination(&title).await {
            Some(path) => path,
            None => return Ok(PersistOutcome::Cancelled),
        };

        self.coordinator
            .persist(id, &content, Some(destination), SaveMode::SaveAs)
            .await
    }

    /// Close a session, asking about unsaved changes if needed
    pub async fn close(&self, id: &SessionId) -> Result<CloseOutcome> {
        let outcome = self.close_flow.close(id).await?;

        if outcome.is_closed() {
            let _ = self.events.send(WorkspaceEvent::Closed { id: id.clone() });
        }

        Ok(outcome)
    }
}
