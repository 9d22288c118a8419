//! Persisted user settings
//!
//! Settings are plain key-value pairs. The editor core reads them as
//! configuration input and never keeps them as its own state.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::database::Database;
use crate::Result;

const KEY_FONT_FAMILY: &str = "font_family";
const KEY_FONT_SIZE: &str = "font_size";
const KEY_STORAGE_ROOT: &str = "storage_root";

#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.with_connection(|conn| {
            let value = conn
                .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db.with_connection(|conn| write_setting(conn, key, value))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.db.with_connection(|conn| delete_setting(conn, key))
    }

    /// Read a JSON-encoded value
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store a value as JSON
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

fn write_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn delete_setting(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
    Ok(())
}

/// Typed view over the editor's persisted settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    pub font_family: String,
    pub font_size: u16,
    /// Overrides the configured storage root when set
    pub storage_root: Option<PathBuf>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_family: "monospace".to_string(),
            font_size: 14,
            storage_root: None,
        }
    }
}

impl EditorSettings {
    /// Load settings, falling back to defaults for missing or malformed keys
    pub fn load(store: &SettingsStore) -> Result<Self> {
        let defaults = Self::default();

        let font_family = store.get(KEY_FONT_FAMILY)?.unwrap_or(defaults.font_family);
        let font_size = match store.get(KEY_FONT_SIZE)? {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring malformed font size setting");
                defaults.font_size
            }),
            None => defaults.font_size,
        };
        let storage_root = store.get(KEY_STORAGE_ROOT)?.map(PathBuf::from);

        Ok(Self {
            font_family,
            font_size,
            storage_root,
        })
    }

    /// Write every key in one transaction, so a failure leaves the old
    /// settings intact.
    pub fn save(&self, store: &SettingsStore) -> Result<()> {
        store.db.transaction(|conn| {
            write_setting(conn, KEY_FONT_FAMILY, &self.font_family)?;
            write_setting(conn, KEY_FONT_SIZE, &self.font_size.to_string())?;
            match &self.storage_root {
                Some(root) => write_setting(conn, KEY_STORAGE_ROOT, &root.to_string_lossy()),
                None => delete_setting(conn, KEY_STORAGE_ROOT),
            }
        })
    }
}
