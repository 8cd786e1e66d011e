use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::models::PresencePayload;

use super::{CacheEntry, PersistentCache};

/// Process-local cache. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry<PresencePayload>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry<PresencePayload>>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("Memory cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, payload: &PresencePayload, stored_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Memory cache lock poisoned"))?;
        entries.insert(key.to_string(), CacheEntry::new(payload.clone(), stored_at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_last_writer_wins() {
        let cache = MemoryCache::new();
        let now = Utc::now();
        cache.set("presence", &PresencePayload::fallback(), now).unwrap();
        let mut newer = PresencePayload::fallback();
        newer.presence_count = 3;
        cache.set("presence", &newer, now).unwrap();
        assert_eq!(cache.get("presence").unwrap().unwrap().payload.presence_count, 3);
        assert!(cache.get("other").unwrap().is_none());
    }
}
