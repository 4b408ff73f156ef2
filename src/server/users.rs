//! User rows: insert and lookup.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::db::{ts_from_sql, ts_to_sql, uuid_from_sql};
use crate::errors::{KeepsakeError, Result};
use crate::models::User;

/// Insert a new user.  A username collision surfaces as `AlreadyExists`.
pub fn insert(conn: &Connection, user: &User) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id.to_string(),
            user.username,
            user.email,
            user.password_hash,
            ts_to_sql(user.created_at),
            ts_to_sql(user.updated_at),
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

pub fn by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password_hash, created_at, updated_at
             FROM users WHERE username = ?1",
            params![username],
            map_row,
        )
        .optional()?;

    row.map(into_user).transpose()
}

pub fn by_id(conn: &Connection, user_id: Uuid) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password_hash, created_at, updated_at
             FROM users WHERE id = ?1",
            params![user_id.to_string()],
            map_row,
        )
        .optional()?;

    row.map(into_user).transpose()
}

type RawUser = (String, String, String, String, String, String);

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_user((id, username, email, password_hash, created_at, updated_at): RawUser) -> Result<User> {
    Ok(User {
        id: uuid_from_sql(&id)?,
        username,
        email,
        password_hash,
        created_at: ts_from_sql(&created_at)?,
        updated_at: ts_from_sql(&updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::db::{now, Database};

    fn user(username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password_hash: "verifier".into(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        let alice = user("alice");
        insert(&conn, &alice).unwrap();

        let found = by_username(&conn, "alice").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert_eq!(found.email, "alice@example.com");
        assert_eq!(found.created_at, alice.created_at);

        let by_id_found = by_id(&conn, alice.id).unwrap().unwrap();
        assert_eq!(by_id_found.username, "alice");
    }

    #[test]
    fn missing_user_is_none() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        assert!(by_username(&conn, "nobody").unwrap().is_none());
        assert!(by_id(&conn, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_already_exists() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock();
        insert(&conn, &user("bob")).unwrap();

        let err = insert(&conn, &user("bob")).unwrap_err();
        assert!(matches!(err, KeepsakeError::AlreadyExists));
    }
}
