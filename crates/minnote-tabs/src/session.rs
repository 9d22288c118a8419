//! Session data structure
//!
//! A session is one open note: its live content, where it is stored, and
//! whether that content still needs saving.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use minnote_cache::CacheKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TabError;
use crate::state::SessionState;
use crate::Result;

/// Opaque session identifier, unique for the lifetime of the process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this session's flushed buffer is cached
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::session(self.0.clone())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// An editable note
    Document,
    /// The settings page, shown as a tab but never edited or saved
    SettingsView,
}

impl SessionKind {
    pub fn default_title(&self) -> &'static str {
        match self {
            SessionKind::Document => "Untitled",
            SessionKind::SettingsView => "Settings",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, SessionKind::SettingsView)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Tab title
    pub title: String,
    /// Current content
    pub content: String,
    /// Destination the content is persisted to, once known
    pub file_path: Option<PathBuf>,
    /// Clean/dirty state
    pub state: SessionState,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    /// Last content change or confirmed persist
    pub last_modified: DateTime<Utc>,
}

impl Session {
    pub fn new(kind: SessionKind) -> Self {
        let now = Utc::now();

        Self {
            id: SessionId::generate(),
            title: kind.default_title().to_string(),
            content: String::new(),
            file_path: None,
            state: SessionState::Clean,
            kind,
            created_at: now,
            last_modified: now,
        }
    }

    /// A clean document session holding contents loaded from `path`
    pub fn loaded(path: PathBuf, content: String) -> Self {
        let mut session = Self::new(SessionKind::Document);
        session.title = title_for_path(&path);
        session.content = content;
        session.file_path = Some(path);
        session
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    /// Attempt to transition to a new state
    pub fn transition_to(&mut self, new_state: SessionState) -> Result<()> {
        if !self.state.can_transition_to(new_state) {
            return Err(TabError::InvalidTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }

        if self.state != new_state {
            tracing::debug!(
                session_id = %self.id,
                from = %self.state,
                to = %new_state,
                "Session state transition"
            );
        }

        self.state = new_state;
        Ok(())
    }

    /// Replace the content. Returns false when nothing changed.
    pub fn apply_edit(&mut self, content: &str) -> Result<bool> {
        if self.kind.is_read_only() {
            return Err(TabError::ReadOnly(self.id.to_string()));
        }

        if self.content == content {
            return Ok(false);
        }

        self.content = content.to_string();
        self.last_modified = Utc::now();
        if self.state == SessionState::Clean {
            self.transition_to(SessionState::Dirty)?;
        }

        Ok(true)
    }

    /// Record that `persisted` was written to `destination`.
    ///
    /// The session only becomes clean if its content is still exactly what
    /// was written; edits made while the write was in flight keep it dirty.
    pub fn mark_persisted(&mut self, destination: &Path, persisted: &str) -> Result<bool> {
        if self.file_path.as_deref() != Some(destination) {
            self.title = title_for_path(destination);
            self.file_path = Some(destination.to_path_buf());
        }
        self.last_modified = Utc::now();

        if self.content == persisted {
            self.transition_to(SessionState::Clean)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Title with an unsaved-changes marker
    pub fn display_title(&self) -> String {
        if self.is_dirty() {
            format!("{} *", self.title)
        } else {
            self.title.clone()
        }
    }
}

fn title_for_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
