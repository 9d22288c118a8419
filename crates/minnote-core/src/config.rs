//! Editor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use minnote_cache::CacheConfig;

use crate::error::CoreError;
use crate::retry::RetryPolicy;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the settings database
    pub database_path: PathBuf,
    /// Default root for note files, unless the settings override it
    pub storage_root: PathBuf,
    /// Quiet period after the last edit before an autosave
    pub autosave_delay: Duration,
    /// Maximum number of cached contents
    pub cache_capacity: usize,
    /// Age after which cached contents are ignored
    pub cache_expiry: Duration,
    /// Notes larger than this are neither saved nor loaded
    pub max_content_bytes: usize,
    /// Storage attempts per save or load, first try included
    pub retry_attempts: u32,
    /// Backoff grows by this much after every failed attempt
    pub retry_backoff: Duration,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("settings.db"),
            storage_root: data_dir.join("notes"),
            autosave_delay: Duration::from_millis(1000),
            cache_capacity: 32,
            cache_expiry: Duration::from_secs(300),
            max_content_bytes: 10 * 1024 * 1024,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("minnote"))
            .unwrap_or_else(|| PathBuf::from(".minnote"))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.cache_capacity,
            expiry: self.cache_expiry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(self.retry_attempts, self.retry_backoff)
    }

    /// Reject limits the editor cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(CoreError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_content_bytes == 0 {
            return Err(CoreError::Config(
                "max_content_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Per-platform application data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
