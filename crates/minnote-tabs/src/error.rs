//! Tab error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Session is read-only: {0}")]
    ReadOnly(String),

    #[error("Close already pending for session: {0}")]
    CloseInProgress(String),
}
