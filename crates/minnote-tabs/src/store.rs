//! Session Store
//!
//! Owns every open session, the creation order used for rendering, the
//! active-session pointer and the content cache that backs tab switching.

use std::collections::HashMap;
use std::path::Path;

use minnote_cache::{CacheConfig, CacheKey, ContentCache};

use crate::error::TabError;
use crate::session::{Session, SessionId, SessionKind};
use crate::state::SessionState;
use crate::Result;

/// Result of switching tabs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Content to show for the newly active session
    pub content: String,
    /// Previously active session whose buffer changed its content on flush
    pub flushed: Option<SessionId>,
}

/// What a close request needs before the session can go away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseRequest {
    /// The session was clean and has been removed
    Closed { next_active: Option<SessionId> },
    /// The session is dirty; a save/discard/cancel decision is required
    NeedsDisposition { id: SessionId, title: String },
}

/// How a pending close was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Content was persisted
    Saved,
    /// Unsaved content is thrown away
    Discarded,
    /// The close was abandoned
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseResolution {
    Removed { next_active: Option<SessionId> },
    KeptOpen,
}

pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
    /// Session ids in creation order
    order: Vec<SessionId>,
    active_id: Option<SessionId>,
    cache: ContentCache,
}

impl SessionStore {
    pub fn new(cache_config: CacheConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            active_id: None,
            cache: ContentCache::new(cache_config),
        }
    }

    /// Create a new session.
    ///
    /// The active session is left alone, except that the first session in an
    /// empty store becomes active.
    pub fn create_session(&mut self, kind: SessionKind) -> Session {
        self.insert(Session::new(kind))
    }

    /// Add a clean document session for contents loaded from `path`
    pub fn open_document(&mut self, path: &Path, content: String) -> Session {
        self.insert(Session::loaded(path.to_path_buf(), content))
    }

    fn insert(&mut self, session: Session) -> Session {
        self.order.push(session.id.clone());
        self.sessions.insert(session.id.clone(), session.clone());

        if self.active_id.is_none() {
            self.active_id = Some(session.id.clone());
        }

        tracing::info!(
            session_id = %session.id,
            kind = ?session.kind,
            title = %session.title,
            "Created session"
        );

        session
    }

    pub fn get(&self, id: &SessionId) -> Result<&Session> {
        self.sessions
            .get(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &SessionId) -> Result<&mut Session> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))
    }

    pub fn active_id(&self) -> Option<&SessionId> {
        self.active_id.as_ref()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_id.as_ref().and_then(|id| self.sessions.get(id))
    }

    /// Make `id` the active session.
    ///
    /// `live_buffer` is what the editor currently shows for the outgoing
    /// session. It is written into that session and into the cache before
    /// the switch, so the session never lags behind what the user typed.
    pub fn activate(&mut self, id: &SessionId, live_buffer: Option<&str>) -> Result<Activation> {
        if !self.sessions.contains_key(id) {
            return Err(TabError::NotFound(id.to_string()));
        }

        let mut flushed = None;
        if let Some(previous_id) = self.active_id.clone() {
            let previous = self.get_mut(&previous_id)?;
            if let Some(buffer) = live_buffer {
                if !previous.kind.is_read_only() && previous.apply_edit(buffer)? {
                    flushed = Some(previous_id.clone());
                }
            }
            let snapshot = previous.content.clone();
            self.cache.put(previous_id.cache_key(), snapshot);
        }

        self.active_id = Some(id.clone());

        let session = self.get(id)?;
        let content = match self.cache.get(&id.cache_key()) {
            Some(cached) => cached,
            None => session.content.clone(),
        };

        tracing::info!(session_id = %id, title = %session.title, "Activated session");

        Ok(Activation { content, flushed })
    }

    /// Replace the content of a session.
    ///
    /// Returns false (and changes nothing) when the content is identical.
    pub fn edit(&mut self, id: &SessionId, content: &str) -> Result<bool> {
        let changed = self.get_mut(id)?.apply_edit(content)?;
        if changed {
            // The session is now newer than any flushed snapshot
            self.cache.remove(&id.cache_key());
        }
        Ok(changed)
    }

    /// Ask to close a session.
    ///
    /// Clean sessions are removed right away. Dirty ones move to
    /// `AwaitingDisposition` and stay open until [`Self::resolve_close`].
    pub fn close(&mut self, id: &SessionId) -> Result<CloseRequest> {
        let state = self.get(id)?.state;

        match state {
            SessionState::Clean => {
                let next_active = self.remove(id);
                Ok(CloseRequest::Closed { next_active })
            }
            SessionState::Dirty => {
                let session = self.get_mut(id)?;
                session.transition_to(SessionState::AwaitingDisposition)?;
                Ok(CloseRequest::NeedsDisposition {
                    id: id.clone(),
                    title: session.title.clone(),
                })
            }
            SessionState::AwaitingDisposition => Err(TabError::CloseInProgress(id.to_string())),
        }
    }

    /// Finish a close that was waiting on a disposition.
    ///
    /// `Saved` only removes the session if it is clean by now; an edit that
    /// landed during the save keeps it open.
    pub fn resolve_close(
        &mut self,
        id: &SessionId,
        disposition: Disposition,
    ) -> Result<CloseResolution> {
        let dirty = self.get(id)?.is_dirty();

        match disposition {
            Disposition::Discarded => {
                let next_active = self.remove(id);
                Ok(CloseResolution::Removed { next_active })
            }
            Disposition::Saved if !dirty => {
                let next_active = self.remove(id);
                Ok(CloseResolution::Removed { next_active })
            }
            Disposition::Saved | Disposition::Cancelled => {
                let session = self.get_mut(id)?;
                if session.state == SessionState::AwaitingDisposition {
                    session.transition_to(SessionState::Dirty)?;
                }
                Ok(CloseResolution::KeptOpen)
            }
        }
    }

    /// Drop a session and its cache entries, returning the new active id
    fn remove(&mut self, id: &SessionId) -> Option<SessionId> {
        if let Some(session) = self.sessions.remove(id) {
            self.order.retain(|other| other != id);
            self.cache.remove(&id.cache_key());
            if let Some(path) = &session.file_path {
                self.cache.remove(&CacheKey::path(path.clone()));
            }

            tracing::info!(session_id = %id, title = %session.title, "Closed session");
        }

        if self.active_id.as_ref() == Some(id) {
            self.active_id = self.order.first().cloned();
        }

        self.active_id.clone()
    }

    /// Record a confirmed persist of `persisted` to `destination`.
    ///
    /// Returns true if the session is now clean.
    pub fn mark_saved(
        &mut self,
        id: &SessionId,
        destination: &Path,
        persisted: &str,
    ) -> Result<bool> {
        self.get_mut(id)?.mark_persisted(destination, persisted)
    }

    /// Sessions in creation order
    pub fn list_ordered(&self) -> Vec<&Session> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .collect()
    }

    /// The open session stored at `path`, if any
    pub fn find_by_path(&self, path: &Path) -> Option<&Session> {
        self.list_ordered()
            .into_iter()
            .find(|s| s.file_path.as_deref() == Some(path))
    }

    /// The first open session of `kind`, if any
    pub fn find_by_kind(&self, kind: SessionKind) -> Option<&Session> {
        self.list_ordered().into_iter().find(|s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ContentCache {
        &mut self.cache
    }

    /// Drop every session and cached entry
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.order.clear();
        self.active_id = None;
        self.cache.clear();
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
