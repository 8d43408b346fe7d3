use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use rusqlite::Connection;

use crate::swagent::storage::{CacheEntry, CacheStorage};
use crate::xwdb::{self, DBResult};

/////*============== CACHE STORAGE QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for CacheEntry {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            url: row.get("url")?,
            status: row.get("status")?,
            content_type: row.get("content_type")?,
            body: row.get("body")?,
            fetched_at: row.get("fetched_at")?,
        })
    }
}

/// [`CacheStorage`] that survives restarts, backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteCacheStorage {
    connection: Mutex<Connection>,
}

impl SqliteCacheStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let connection = xwdb::connect(path)?;
        xwdb::initialize_db(&connection)?;
        Ok(Self::new(connection))
    }

    /// Wraps a connection whose tables already exist.
    pub fn new(connection: Connection) -> Self {
        Self { connection: Mutex::new(connection) }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| anyhow!("Cache database lock was poisoned"))
    }
}

fn upsert(connection: &Connection, cache: &str, entry: &CacheEntry) -> DBResult<()> {
    connection
        .prepare_cached("INSERT OR IGNORE INTO Caches (cache_name) VALUES (:cache_name)")?
        .execute(rusqlite::named_params! { ":cache_name": cache })?;

    let query_params = rusqlite::named_params! {
            ":cache_name":   cache,
            ":url":          entry.url,
            ":status":       entry.status,
            ":content_type": entry.content_type,
            ":body":         entry.body,
            ":fetched_at":   entry.fetched_at,
    };

    connection
        .prepare_cached(
            "INSERT OR REPLACE INTO CacheEntries
                ( cache_name,  url,  status,  content_type,  body,  fetched_at)
             VALUES
                (:cache_name, :url, :status, :content_type, :body, :fetched_at)",
        )?
        .execute(query_params)?;

    Ok(())
}

impl CacheStorage for SqliteCacheStorage {
    fn put(&self, cache: &str, entry: CacheEntry) -> Result<()> {
        log::trace!("[SqliteCacheStorage::put] {cache} <- {}", entry.url);
        let connection = self.connection()?;
        upsert(&connection, cache, &entry)?;
        Ok(())
    }

    fn put_all(&self, cache: &str, entries: Vec<CacheEntry>) -> Result<()> {
        let mut connection = self.connection()?;
        let tx = connection.transaction()?;
        for entry in &entries {
            upsert(&tx, cache, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn lookup(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>> {
        let connection = self.connection()?;
        let entry = connection
            .prepare_cached("SELECT * FROM CacheEntries WHERE cache_name = :cache_name AND url = :url")?
            .query(rusqlite::named_params! { ":cache_name": cache, ":url": url })?
            .next()?
            .map(|row| CacheEntry::try_from(row))
            .transpose()?;
        Ok(entry)
    }

    fn cache_names(&self) -> Result<Vec<String>> {
        let connection = self.connection()?;
        let names = connection
            .prepare("SELECT cache_name FROM Caches ORDER BY cache_name")?
            .query_map([], |row| row.get("cache_name"))?
            .collect::<DBResult<Vec<String>>>()?;
        Ok(names)
    }

    fn delete_cache(&self, cache: &str) -> Result<bool> {
        let mut connection = self.connection()?;
        let tx = connection.transaction()?;
        tx.execute(
            "DELETE FROM CacheEntries WHERE cache_name = :cache_name",
            rusqlite::named_params! { ":cache_name": cache },
        )?;
        let removed = tx.execute(
            "DELETE FROM Caches WHERE cache_name = :cache_name",
            rusqlite::named_params! { ":cache_name": cache },
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn entry_count(&self, cache: &str) -> Result<usize> {
        let connection = self.connection()?;
        let count = connection.query_row(
            "SELECT COUNT(*) FROM CacheEntries WHERE cache_name = :cache_name",
            rusqlite::named_params! { ":cache_name": cache },
            |row| row.get::<_, i64>(0),
        )?;
        Ok(usize::try_from(count)?)
    }
}
