//! MinNote Tab Management
//!
//! Every open note is a [`Session`] (shown as a tab). The [`SessionStore`]
//! owns all of them, tracks which one is active, and drives each through
//! its clean/dirty state machine.

mod error;
mod session;
mod state;
mod store;

pub use error::TabError;
pub use session::{Session, SessionId, SessionKind};
pub use state::SessionState;
pub use store::{Activation, CloseRequest, CloseResolution, Disposition, SessionStore};

pub type Result<T> = std::result::Result<T, TabError>;
