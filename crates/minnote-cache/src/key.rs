//! Cache keys

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Contents are cached either per open session or per storage destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum CacheKey {
    /// Live buffer flushed from a session
    Session(String),
    /// Contents known to be stored at a destination
    Path(PathBuf),
}

impl CacheKey {
    pub fn session(id: impl Into<String>) -> Self {
        CacheKey::Session(id.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        CacheKey::Path(path.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Session(id) => write!(f, "session:{}", id),
            CacheKey::Path(path) => write!(f, "path:{}", path.display()),
        }
    }
}
