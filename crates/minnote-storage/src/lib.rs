//! MinNote Storage Layer
//!
//! The slow side of the editor: note contents live in files reached through
//! the [`NoteStorage`] collaborator, and user settings live in a small SQLite
//! database. Nothing here knows about open sessions or caching.

mod backend;
mod database;
mod error;
mod fs;
mod memory;
mod migrations;
mod settings;

pub use backend::NoteStorage;
pub use database::Database;
pub use error::StorageError;
pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use settings::{EditorSettings, SettingsStore};

pub type Result<T> = std::result::Result<T, StorageError>;
