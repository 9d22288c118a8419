//! Session State Machine
//!
//! ```text
//! Clean <──persist── Dirty ──close requested──> AwaitingDisposition
//!   └──────edit────────^  ^────────cancel────────────┘    │
//!   ^────────────────────────────saved────────────────────┘
//! ```
//!
//! A discarded session leaves the store from `AwaitingDisposition` directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Content matches what was last persisted (or was never edited)
    Clean,
    /// Content has unpersisted edits
    Dirty,
    /// Dirty and a close is waiting on a save/discard/cancel decision
    AwaitingDisposition,
}

impl SessionState {
    /// Check if transition to another state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        match (self, target) {
            (SessionState::Clean, SessionState::Dirty) => true,
            (SessionState::Dirty, SessionState::Clean) => true,
            (SessionState::Dirty, SessionState::AwaitingDisposition) => true,
            // Cancel
            (SessionState::AwaitingDisposition, SessionState::Dirty) => true,
            // Saved before removal
            (SessionState::AwaitingDisposition, SessionState::Clean) => true,
            (a, b) if *a == b => true,
            _ => false,
        }
    }

    /// Returns true if the content has not been persisted
    pub fn is_dirty(&self) -> bool {
        !matches!(self, SessionState::Clean)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Clean => "clean",
            SessionState::Dirty => "dirty",
            SessionState::AwaitingDisposition => "awaiting_disposition",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
