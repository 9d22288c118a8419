//! MinNote Core
//!
//! Keeps several notes open at once and mediates between the in-memory
//! sessions and the slower note storage: dirty tracking, debounced
//! autosave, retried saves and loads, and the save/discard/cancel flow
//! when a dirty note is closed.
//!
//! All in-memory state sits behind one lock in [`Workspace`]; the only
//! suspension points are storage calls and user prompts.

mod autosave;
mod close_flow;
mod config;
mod coordinator;
mod error;
mod events;
mod prompt;
mod retry;
mod workspace;

pub use autosave::AutosavePolicy;
pub use close_flow::{CloseConfirmationFlow, CloseOutcome};
pub use config::Config;
pub use coordinator::{PersistOutcome, SaveLoadCoordinator, SaveMode};
pub use error::CoreError;
pub use events::WorkspaceEvent;
pub use prompt::{Choice, ScriptedPrompts, UserPrompts};
pub use retry::{RetryError, RetryPolicy};
pub use workspace::{OpenOutcome, Workspace};

// Re-export the layers below
pub use minnote_cache::{CacheConfig, CacheKey, ContentCache};
pub use minnote_storage::{
    Database, EditorSettings, FsStorage, MemoryStorage, NoteStorage, SettingsStore,
    StorageError,
};
pub use minnote_tabs::{Activation, Session, SessionId, SessionKind, SessionState, TabError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
