//! SQLite handle and schema for the server store.
//!
//! One connection behind a mutex, WAL journal mode for concurrent
//! readers.  All instants are stored as fixed-width RFC 3339 text
//! (microseconds, `Z` suffix) so that lexicographic comparison in SQL
//! matches chronological order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::errors::{KeepsakeError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS secrets (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(id),
    type       TEXT NOT NULL,
    name       TEXT NOT NULL,
    metadata   TEXT NOT NULL DEFAULT '',
    data       BLOB NOT NULL,
    sync_hash  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_secrets_user_id   ON secrets(user_id);
CREATE INDEX IF NOT EXISTS idx_secrets_type      ON secrets(type);
CREATE INDEX IF NOT EXISTS idx_secrets_name      ON secrets(name);
CREATE INDEX IF NOT EXISTS idx_secrets_sync_hash ON secrets(sync_hash);

CREATE TABLE IF NOT EXISTS operation_log (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    id        TEXT NOT NULL UNIQUE,
    user_id   TEXT NOT NULL REFERENCES users(id),
    secret_id TEXT NOT NULL,
    kind      TEXT NOT NULL,
    instant   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_oplog_user_id ON operation_log(user_id);
CREATE INDEX IF NOT EXISTS idx_oplog_instant ON operation_log(instant);
";

/// The server database handle.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for a sequence of statements.
    ///
    /// A poisoned lock means a worker panicked mid-statement; the
    /// connection itself is still usable, so recover it.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Timestamp and id codecs shared by the row-mapping modules
// ---------------------------------------------------------------------------

/// Current server clock, truncated to microseconds so every stored
/// instant round-trips exactly through its SQL text form.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

pub(crate) fn ts_to_sql(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| KeepsakeError::Serialization(format!("timestamp '{s}': {e}")))
}

pub(crate) fn uuid_from_sql(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| KeepsakeError::Serialization(format!("uuid '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_applies_schema() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        // All three tables exist and are empty.
        for table in ["users", "secrets", "operation_log"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} should start empty");
        }
    }

    #[test]
    fn timestamps_roundtrip_through_sql_text() {
        let t = now();
        let back = ts_from_sql(&ts_to_sql(t)).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn sql_timestamps_order_lexicographically() {
        let early = ts_to_sql(now());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let late = ts_to_sql(now());
        assert!(early < late);
    }
}
