//! Local caching of the last good presence payload.
//!
//! This module provides the `PersistentCache` contract used by the sync
//! engine, plus two stores:
//! - `FileCache`: one JSON file per key, survives restarts
//! - `MemoryCache`: process-local, for tests and `--no-persist`
//!
//! Entries are never evicted; each successful fetch overwrites the previous
//! one. Freshness is decided by the reader from `stored_at`.

pub mod manager;
pub mod memory;

pub use manager::{CacheEntry, FileCache, PersistentCache};
pub use memory::MemoryCache;
