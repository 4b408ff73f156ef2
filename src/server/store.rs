//! The secret store: owner-scoped CRUD over encrypted rows.
//!
//! Every query is scoped by `user_id`.  A secret that exists but is
//! owned by someone else surfaces exactly like a missing one; the
//! store never reveals existence across owners.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::db::{ts_from_sql, ts_to_sql, uuid_from_sql};
use crate::errors::{KeepsakeError, Result};
use crate::models::{Secret, SecretType};

/// Insert a fully formed secret.  A duplicate id is `AlreadyExists`.
pub fn insert(conn: &Connection, secret: &Secret) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO secrets (id, user_id, type, name, metadata, data, sync_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            secret.id.to_string(),
            secret.user_id.to_string(),
            secret.kind.as_str(),
            secret.name,
            secret.metadata,
            secret.data,
            secret.sync_hash,
            ts_to_sql(secret.created_at),
            ts_to_sql(secret.updated_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(KeepsakeError::AlreadyExists)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch one secret, scoped to its owner.
pub fn by_id(conn: &Connection, secret_id: Uuid, user_id: Uuid) -> Result<Option<Secret>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, type, name, metadata, data, sync_hash, created_at, updated_at
             FROM secrets WHERE id = ?1 AND user_id = ?2",
            params![secret_id.to_string(), user_id.to_string()],
            map_row,
        )
        .optional()?;

    row.map(into_secret).transpose()
}

/// All of a user's secrets, newest creation first.
pub fn list_by_user(conn: &Connection, user_id: Uuid) -> Result<Vec<Secret>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, type, name, metadata, data, sync_hash, created_at, updated_at
         FROM secrets WHERE user_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], map_row)?;

    collect(rows)
}

/// Secrets whose `updated_at` is strictly after `after`, oldest first.
pub fn list_modified_after(
    conn: &Connection,
    user_id: Uuid,
    after: DateTime<Utc>,
) -> Result<Vec<Secret>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, type, name, metadata, data, sync_hash, created_at, updated_at
         FROM secrets WHERE user_id = ?1 AND updated_at > ?2 ORDER BY updated_at ASC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string(), ts_to_sql(after)], map_row)?;

    collect(rows)
}

/// Update the mutable fields of a secret.
///
/// Touches `name`, `metadata`, `data`, `sync_hash`, and `updated_at`;
/// never `user_id`, `type`, `created_at`, or `id`.  Zero affected rows
/// means missing or not owned, and both are `NotFound`.
pub fn update(conn: &Connection, secret: &Secret) -> Result<()> {
    let affected = conn.execute(
        "UPDATE secrets
         SET name = ?3, metadata = ?4, data = ?5, sync_hash = ?6, updated_at = ?7
         WHERE id = ?1 AND user_id = ?2",
        params![
            secret.id.to_string(),
            secret.user_id.to_string(),
            secret.name,
            secret.metadata,
            secret.data,
            secret.sync_hash,
            ts_to_sql(secret.updated_at),
        ],
    )?;

    if affected == 0 {
        return Err(KeepsakeError::NotFound);
    }
    Ok(())
}

/// Delete a secret.  Zero affected rows is `NotFound`.
pub fn delete(conn: &Connection, secret_id: Uuid, user_id: Uuid) -> Result<()> {
    let affected = conn.execute(
        "DELETE FROM secrets WHERE id = ?1 AND user_id = ?2",
        params![secret_id.to_string(), user_id.to_string()],
    )?;

    if affected == 0 {
        return Err(KeepsakeError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

type RawSecret = (
    String,
    String,
    String,
    String,
    String,
    Vec<u8>,
    String,
    String,
    String,
);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSecret> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn into_secret(raw: RawSecret) -> Result<Secret> {
    let (id, user_id, kind, name, metadata, data, sync_hash, created_at, updated_at) = raw;
    Ok(Secret {
        id: uuid_from_sql(&id)?,
        user_id: uuid_from_sql(&user_id)?,
        kind: kind.parse::<SecretType>()?,
        name,
        metadata,
        data,
        sync_hash,
        created_at: ts_from_sql(&created_at)?,
        updated_at: ts_from_sql(&updated_at)?,
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<RawSecret>>,
) -> Result<Vec<Secret>> {
    let mut secrets = Vec::new();
    for row in rows {
        secrets.push(into_secret(row?)?);
    }
    Ok(secrets)
}
