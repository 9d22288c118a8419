//! MinNote Content Cache
//!
//! Keeps recently flushed or persisted note contents in memory so switching
//! tabs and reopening files does not go back to storage.
//!
//! Two independent limits apply:
//! - size: inserting past capacity evicts the oldest-inserted entry (FIFO)
//! - age: entries older than the expiry read as misses, but stay in place
//!   until evicted, overwritten or removed

mod cache;
mod key;

pub use cache::{CacheConfig, ContentCache};
pub use key::CacheKey;
