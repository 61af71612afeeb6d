//! On-disk TTL cache for fetched pages
//!
//! Listing sites rate-limit aggressively, so fetch results are cached as
//! small JSON files keyed by the request. A cache problem is never fatal:
//! read and write failures degrade to a miss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    expires: DateTime<Utc>,
    body: String,
}

/// One cache directory with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
    ttl: Duration,
}

impl PageCache {
    pub fn new<P: Into<PathBuf>>(dir: P, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cache key for a request: CRC32 over method, url and body.
    pub fn request_key(method: &str, url: &str, body: &str) -> String {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(method.as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
        hasher.update(body.as_bytes());
        format!("{:08x}", hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Fetch an unexpired entry. An expired entry is removed and reported
    /// as a miss.
    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;
        if entry.expires <= Utc::now() {
            log::debug!("cache entry {} expired", key);
            let _ = fs::remove_file(&path);
            return None;
        }
        Some(entry.body)
    }

    /// Write an entry through to disk.
    pub fn store(&self, key: &str, body: &str) {
        if let Err(e) = self.try_store(key, body) {
            log::warn!("cache write for {} failed: {}", key, e);
        }
    }

    fn try_store(&self, key: &str, body: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let entry = CacheEntry {
            key: key.to_string(),
            expires: Utc::now() + ttl,
            body: body.to_string(),
        };
        fs::write(self.entry_path(key), serde_json::to_string(&entry)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("proxy-harvest-cache-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn test_request_key_is_stable_and_distinct() {
        let a = PageCache::request_key("GET", "http://example.com/", "");
        let b = PageCache::request_key("GET", "http://example.com/", "");
        let c = PageCache::request_key("POST", "http://example.com/", "xpp=5");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_store_then_get() {
        let dir = temp_cache_dir("roundtrip");
        let cache = PageCache::new(&dir, Duration::from_secs(60));
        let key = PageCache::request_key("GET", "http://example.com/a", "");

        assert_eq!(cache.get(&key), None);
        cache.store(&key, "<html>body</html>");
        assert_eq!(cache.get(&key), Some("<html>body</html>".to_string()));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let dir = temp_cache_dir("expiry");
        let cache = PageCache::new(&dir, Duration::ZERO);
        let key = PageCache::request_key("GET", "http://example.com/b", "");

        cache.store(&key, "stale");
        assert_eq!(cache.get(&key), None);
        assert!(!dir.join(format!("{}.json", key)).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = temp_cache_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let cache = PageCache::new(&dir, Duration::from_secs(60));
        let key = PageCache::request_key("GET", "http://example.com/c", "");
        fs::write(dir.join(format!("{}.json", key)), "not json").unwrap();

        assert_eq!(cache.get(&key), None);

        let _ = fs::remove_dir_all(&dir);
    }
}
