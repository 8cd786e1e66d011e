use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::PresencePayload;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, stored_at: DateTime<Utc>) -> Self {
        Self { payload, stored_at }
    }

    /// Age of the entry at `now`. Entries stamped in the future (clock skew)
    /// count as zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Fresh entries let a fetch skip the network entirely.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }

    /// Entries up to twice the freshness window may still be shown on startup.
    pub fn is_usable_fallback(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window * 2
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = (self.age(now).as_secs() / 60) as i64;
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Key-value store for the last known good payload.
///
/// Reads and writes are last-writer-wins; values are opaque blobs with a
/// timestamp, so no transactions are needed.
///
/// Calls are synchronous and made from async tasks while the sync state is
/// locked, so implementations must return quickly.
pub trait PersistentCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry<PresencePayload>>>;

    fn set(&self, key: &str, payload: &PresencePayload, stored_at: DateTime<Utc>) -> Result<()>;
}

/// File-backed cache: `<cache_dir>/<key>.json`.
pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }
}

impl PersistentCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<CacheEntry<PresencePayload>>> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", key))?;

        let entry: CacheEntry<PresencePayload> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", key))?;

        Ok(Some(entry))
    }

    fn set(&self, key: &str, payload: &PresencePayload, stored_at: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry::new(payload, stored_at);
        let contents = serde_json::to_string_pretty(&entry)?;
        let path = self.cache_path(key);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", key))?;
        debug!(cache = key, "Cache updated");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, MemberStatus};

    const WINDOW: Duration = Duration::from_secs(60);

    fn payload() -> PresencePayload {
        PresencePayload {
            presence_count: 7,
            members: vec![Member {
                username: "a".to_string(),
                avatar_url: String::new(),
                status: MemberStatus::Dnd,
            }],
        }
    }

    #[test]
    fn test_freshness_boundary_is_exclusive() {
        let now = Utc::now();
        let at_window = CacheEntry::new((), now - chrono::Duration::seconds(60));
        let inside = CacheEntry::new((), now - chrono::Duration::milliseconds(59_999));
        assert!(!at_window.is_fresh(now, WINDOW));
        assert!(inside.is_fresh(now, WINDOW));
    }

    #[test]
    fn test_usable_fallback_is_twice_the_window() {
        let now = Utc::now();
        let ninety = CacheEntry::new((), now - chrono::Duration::seconds(90));
        let two_minutes = CacheEntry::new((), now - chrono::Duration::seconds(120));
        assert!(!ninety.is_fresh(now, WINDOW));
        assert!(ninety.is_usable_fallback(now, WINDOW));
        assert!(!two_minutes.is_usable_fallback(now, WINDOW));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let now = Utc::now();
        let skewed = CacheEntry::new((), now + chrono::Duration::seconds(30));
        assert_eq!(skewed.age(now), Duration::ZERO);
        assert!(skewed.is_fresh(now, WINDOW));
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        assert_eq!(CacheEntry::new((), now).age_display(now), "just now");
        assert_eq!(
            CacheEntry::new((), now - chrono::Duration::minutes(5)).age_display(now),
            "5m ago"
        );
        assert_eq!(
            CacheEntry::new((), now - chrono::Duration::hours(3)).age_display(now),
            "3h ago"
        );
        assert_eq!(
            CacheEntry::new((), now - chrono::Duration::days(2)).age_display(now),
            "2d ago"
        );
    }

    #[test]
    fn test_file_cache_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested")).unwrap();
        assert!(cache.get("presence").unwrap().is_none());

        let first = Utc::now() - chrono::Duration::minutes(10);
        cache.set("presence", &PresencePayload::fallback(), first).unwrap();
        let second = Utc::now();
        cache.set("presence", &payload(), second).unwrap();

        let entry = cache.get("presence").unwrap().unwrap();
        assert_eq!(entry.payload, payload());
        assert_eq!(entry.stored_at, second);
    }

    #[test]
    fn test_file_cache_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("presence.json"), "{ not json").unwrap();
        assert!(cache.get("presence").is_err());
    }
}
