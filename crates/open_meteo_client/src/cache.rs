//! Response cache for provider calls.
//!
//! Keyed by the full request URL, so two requests share an entry only when
//! every query parameter matches. A `DashMap` serves repeat calls within a
//! process. When a directory is attached, entries are also written there as
//! one JSON file per URL so later runs can reuse them until the TTL runs out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::response::ForecastResponse;

/// A cached response with staleness tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub response: ForecastResponse,
}

impl CachedResponse {
    /// Entries stamped in the future are treated as fresh.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now()
            .signed_duration_since(self.fetched_at)
            .to_std()
            .map_or(false, |age| age > ttl)
    }
}

/// Thread-safe response cache shared by every clone of a client.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Arc<DashMap<String, CachedResponse>>,
    ttl: Duration,
    dir: Option<PathBuf>,
}

impl ResponseCache {
    /// Memory-only cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            dir: None,
        }
    }

    /// Also persist entries under `dir`.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Fresh response for `url`, evicting it if it has expired.
    pub fn get(&self, url: &str) -> Option<ForecastResponse> {
        {
            if let Some(entry) = self.entries.get(url) {
                if !entry.is_stale(self.ttl) {
                    return Some(entry.response.clone());
                }
            }
        }
        self.entries.remove(url);

        let entry = self.load(url)?;
        let response = entry.response.clone();
        self.entries.insert(url.to_string(), entry);
        Some(response)
    }

    pub fn insert(&self, url: String, response: ForecastResponse) {
        let entry = CachedResponse {
            url: url.clone(),
            fetched_at: Utc::now(),
            response,
        };
        self.store(&entry);
        self.entries.insert(url, entry);
    }

    /// Entries held in memory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn file_for(&self, url: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let digest = Sha256::digest(url.as_bytes());
        Some(dir.join(format!("{digest:x}.json")))
    }

    /// Read a fresh entry from disk. Stale, corrupt, or colliding files are
    /// removed.
    fn load(&self, url: &str) -> Option<CachedResponse> {
        let path = self.file_for(url)?;
        let raw = fs::read_to_string(&path).ok()?;

        let entry = match serde_json::from_str::<CachedResponse>(&raw) {
            Ok(entry) if entry.url == url && !entry.is_stale(self.ttl) => entry,
            Ok(_) => {
                debug!("Dropping stale cache file {}", path.display());
                let _ = fs::remove_file(&path);
                return None;
            }
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        debug!("Loaded cached response from {}", path.display());
        Some(entry)
    }

    fn store(&self, entry: &CachedResponse) {
        let Some(path) = self.file_for(&entry.url) else {
            return;
        };
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| {
                let body = serde_json::to_vec(entry).map_err(std::io::Error::other)?;
                fs::write(&path, body)
            });
        if let Err(e) = result {
            warn!("Failed to write cache file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_response() -> ForecastResponse {
        serde_json::from_str(r#"{"hourly": {"time": []}}"#).expect("response should deserialize")
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("https://example.test/a".into(), empty_response());
        assert!(cache.get("https://example.test/a").is_some());
        assert!(cache.get("https://example.test/b").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("https://example.test/a".into(), empty_response());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("https://example.test/a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let other = cache.clone();
        other.insert("k".into(), empty_response());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_some());
    }

    #[test]
    fn test_separate_caches_share_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("cache");

        let first = ResponseCache::new(Duration::from_secs(60)).with_dir(&dir);
        first.insert("https://example.test/a".into(), empty_response());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        let second = ResponseCache::new(Duration::from_secs(60)).with_dir(&dir);
        assert!(second.is_empty());
        assert!(second.get("https://example.test/a").is_some());
        assert_eq!(second.len(), 1);
        assert!(second.get("https://example.test/b").is_none());
    }

    #[test]
    fn test_expired_file_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ResponseCache::new(Duration::from_secs(60)).with_dir(tmp.path());
        writer.insert("u".into(), empty_response());

        std::thread::sleep(Duration::from_millis(5));
        let reader = ResponseCache::new(Duration::ZERO).with_dir(tmp.path());
        assert!(reader.get("u").is_none());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(Duration::from_secs(60)).with_dir(tmp.path());
        let path = cache.file_for("u").unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(cache.get("u").is_none());
        assert!(!path.exists());
    }
}
