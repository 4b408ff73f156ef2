//! The operation log: the authoritative record of what happened.
//!
//! Append-only.  Entries are written in the same transaction as the
//! store mutation they describe, so readers either see both or
//! neither.  `since` replays entries in `(instant, insertion order)`;
//! the insertion order comes from the autoincrement `seq` column, which
//! breaks ties when the clock is coarser than the write rate.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::db::{ts_from_sql, ts_to_sql, uuid_from_sql};
use crate::errors::Result;
use crate::models::{OperationEntry, OperationKind};

/// Append one entry.
pub fn append(conn: &Connection, entry: &OperationEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO operation_log (id, user_id, secret_id, kind, instant)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id.to_string(),
            entry.user_id.to_string(),
            entry.secret_id.to_string(),
            entry.kind.as_str(),
            ts_to_sql(entry.instant),
        ],
    )?;
    Ok(())
}

/// All of a user's entries with `instant` strictly after `after`.
pub fn since(conn: &Connection, user_id: Uuid, after: DateTime<Utc>) -> Result<Vec<OperationEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, secret_id, kind, instant
         FROM operation_log
         WHERE user_id = ?1 AND instant > ?2
         ORDER BY instant ASC, seq ASC",
    )?;

    let rows = stmt.query_map(params![user_id.to_string(), ts_to_sql(after)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, user_id, secret_id, kind, instant) = row?;
        entries.push(OperationEntry {
            id: uuid_from_sql(&id)?,
            user_id: uuid_from_sql(&user_id)?,
            secret_id: uuid_from_sql(&secret_id)?,
            kind: kind.parse::<OperationKind>()?,
            instant: ts_from_sql(&instant)?,
        });
    }
    Ok(entries)
}
