//! Close Confirmation Flow
//!
//! Closing a clean session is immediate. Closing a dirty one asks the user
//! exactly once: save, discard or cancel. A failed save aborts the close so
//! unsaved work is never dropped silently.

use std::sync::Arc;

use minnote_tabs::{CloseRequest, CloseResolution, Disposition, SessionId, SessionStore};
use parking_lot::Mutex;

use crate::coordinator::{PersistOutcome, SaveLoadCoordinator, SaveMode};
use crate::prompt::{Choice, UserPrompts};
use crate::Result;

const CLOSE_OPTIONS: [Choice; 3] = [Choice::Save, Choice::Discard, Choice::Cancel];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Session was clean and closed without asking
    Closed { next_active: Option<SessionId> },
    /// Content was saved, then the session closed
    Saved { next_active: Option<SessionId> },
    /// Unsaved content was thrown away
    Discarded { next_active: Option<SessionId> },
    /// The user backed out; the session stays open and dirty
    Cancelled,
    /// The save went through but newer edits arrived meanwhile
    KeptOpen,
}

impl CloseOutcome {
    /// Whether the session is gone
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            CloseOutcome::Closed { .. } | CloseOutcome::Saved { .. } | CloseOutcome::Discarded { .. }
        )
    }

    pub fn next_active(&self) -> Option<&SessionId> {
        match self {
            CloseOutcome::Closed { next_active }
            | CloseOutcome::Saved { next_active }
            | CloseOutcome::Discarded { next_active } => next_active.as_ref(),
            CloseOutcome::Cancelled | CloseOutcome::KeptOpen => None,
        }
    }
}

#[derive(Clone)]
pub struct CloseConfirmationFlow {
    store: Arc<Mutex<SessionStore>>,
    coordinator: SaveLoadCoordinator,
    prompts: Arc<dyn UserPrompts>,
}

impl CloseConfirmationFlow {
    pub fn new(
        store: Arc<Mutex<SessionStore>>,
        coordinator: SaveLoadCoordinator,
        prompts: Arc<dyn UserPrompts>,
    ) -> Self {
        Self {
            store,
            coordinator,
            prompts,
        }
    }

    pub async fn close(&self, id: &SessionId) -> Result<CloseOutcome> {
        let request = self.store.lock().close(id)?;

        let title = match request {
            CloseRequest::Closed { next_active } => {
                return Ok(CloseOutcome::Closed { next_active });
            }
            CloseRequest::NeedsDisposition { title, .. } => title,
        };

        let question = format!("Save changes to \"{}\" before closing?", title);
        let choice = self.prompts.prompt_user(&question, &CLOSE_OPTIONS).await;

        tracing::debug!(session_id = %id, ?choice, "Close disposition chosen");

        match choice {
            Choice::Cancel => {
                self.resolve(id, Disposition::Cancelled)?;
                Ok(CloseOutcome::Cancelled)
            }
            Choice::Discard => match self.resolve(id, Disposition::Discarded)? {
                CloseResolution::Removed { next_active } => {
                    Ok(CloseOutcome::Discarded { next_active })
                }
                CloseResolution::KeptOpen => Ok(CloseOutcome::KeptOpen),
            },
            Choice::Save => self.save_then_close(id).await,
        }
    }

    async fn save_then_close(&self, id: &SessionId) -> Result<CloseOutcome> {
        let content = self.store.lock().get(id)?.content.clone();

        match self
            .coordinator
            .persist(id, &content, None, SaveMode::Explicit)
            .await
        {
            Ok(PersistOutcome::Saved { .. }) => match self.resolve(id, Disposition::Saved)? {
                CloseResolution::Removed { next_active } => Ok(CloseOutcome::Saved { next_active }),
                CloseResolution::KeptOpen => {
                    tracing::info!(session_id = %id, "Edited during save, keeping session open");
                    Ok(CloseOutcome::KeptOpen)
                }
            },
            Ok(PersistOutcome::Cancelled) | Ok(PersistOutcome::Skipped) => {
                self.resolve(id, Disposition::Cancelled)?;
                Ok(CloseOutcome::Cancelled)
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Save before close failed, keeping session open");
                self.resolve(id, Disposition::Cancelled)?;
                Err(e)
            }
        }
    }

    fn resolve(&self, id: &SessionId, disposition: Disposition) -> Result<CloseResolution> {
        Ok(self.store.lock().resolve_close(id, disposition)?)
    }
}
