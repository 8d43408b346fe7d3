use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::swagent::http::Response;

/// A stored response, keyed by its request URL inside a named cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn from_response(url: &str, response: &Response, fetched_at: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            body: response.body.clone(),
            fetched_at,
        }
    }

    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        }
    }
}

/// Named caches of URL-keyed entries.
///
/// Entries are overwritten in place (last write wins) and only ever removed by
/// deleting the whole cache they belong to.
pub trait CacheStorage: Send + Sync {
    /// Inserts or overwrites one entry, creating the cache if needed.
    fn put(&self, cache: &str, entry: CacheEntry) -> Result<()>;

    /// Stores every entry or none of them.
    fn put_all(&self, cache: &str, entries: Vec<CacheEntry>) -> Result<()>;

    fn lookup(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>>;

    fn cache_names(&self) -> Result<Vec<String>>;

    /// Returns whether a cache by that name existed.
    fn delete_cache(&self, cache: &str) -> Result<bool>;

    fn entry_count(&self, cache: &str) -> Result<usize>;
}

/// In-process [`CacheStorage`]. Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: Mutex<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn caches(&self) -> Result<MutexGuard<'_, HashMap<String, HashMap<String, CacheEntry>>>> {
        self.caches.lock().map_err(|_| anyhow!("Cache storage lock was poisoned"))
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn put(&self, cache: &str, entry: CacheEntry) -> Result<()> {
        self.caches()?
            .entry(cache.to_string())
            .or_default()
            .insert(entry.url.clone(), entry);
        Ok(())
    }

    fn put_all(&self, cache: &str, entries: Vec<CacheEntry>) -> Result<()> {
        let mut caches = self.caches()?;
        let target = caches.entry(cache.to_string()).or_default();
        target.extend(entries.into_iter().map(|entry| (entry.url.clone(), entry)));
        Ok(())
    }

    fn lookup(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>> {
        Ok(self.caches()?.get(cache).and_then(|entries| entries.get(url)).cloned())
    }

    fn cache_names(&self) -> Result<Vec<String>> {
        let mut names = self.caches()?.keys().cloned().collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    fn delete_cache(&self, cache: &str) -> Result<bool> {
        Ok(self.caches()?.remove(cache).is_some())
    }

    fn entry_count(&self, cache: &str) -> Result<usize> {
        Ok(self.caches()?.get(cache).map_or(0, HashMap::len))
    }
}
