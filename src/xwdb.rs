use std::path::Path;

use rusqlite::{Connection, ErrorCode};

pub mod cachestore;
pub mod earned;
pub mod schema;

pub use cachestore::SqliteCacheStorage;
pub use earned::{insert_earned, query_earned, query_held_ids, record_new_badges};

pub type DBResult<T> = Result<T, rusqlite::Error>;

pub fn connect(path: impl AsRef<Path>) -> DBResult<Connection> {
    Connection::open(path)
}

pub fn initialize_db(connection: &Connection) -> DBResult<()> {
    log::debug!("[initialize_db] creating EarnedBadges table...");
    connection.execute(schema::EARNED_BADGES_SCHEMA, [])?;

    log::debug!("[initialize_db] creating Caches table...");
    connection.execute(schema::CACHES_SCHEMA, [])?;

    log::debug!("[initialize_db] creating CacheEntries table...");
    connection.execute(schema::CACHE_ENTRIES_SCHEMA, [])?;

    Ok(())
}

/// Turns a uniqueness violation into `Ok(false)` ("already there"); any other error
/// is passed through.
pub fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _) if failure.code == ErrorCode::ConstraintViolation => {
            log::trace!("[swallow_constraint_violation] Row already exists: {err}");
            Ok(false)
        }
        other => Err(other),
    }
}
