//! Workspace notifications for the status line

use std::path::PathBuf;

use minnote_tabs::SessionId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    Edited { id: SessionId, char_count: usize },
    Saved { id: SessionId, destination: PathBuf },
    SaveFailed { id: SessionId, reason: String },
    Loaded { id: SessionId, source: PathBuf },
    Closed { id: SessionId },
}
