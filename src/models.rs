//! Domain types and wire DTOs shared by the server, the client cache,
//! and the CLI.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::KeepsakeError;
use crate::payload::SecretPayload;

/// The four kinds of secret a user can store.  Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    Credentials,
    Text,
    Binary,
    Card,
}

impl SecretType {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretType::Credentials => "credentials",
            SecretType::Text => "text",
            SecretType::Binary => "binary",
            SecretType::Card => "card",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = KeepsakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" => Ok(SecretType::Credentials),
            "text" => Ok(SecretType::Text),
            "binary" => Ok(SecretType::Binary),
            "card" => Ok(SecretType::Card),
            other => Err(KeepsakeError::Validation(format!(
                "unknown secret type '{other}'"
            ))),
        }
    }
}

/// A registered user.  The password hash never leaves the server: it is
/// skipped on serialization and defaulted on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored secret row: the envelope blob plus its plaintext-side
/// bookkeeping.  `data` is the ciphertext; `sync_hash` is always the
/// fingerprint of those exact bytes.
#[derive(Debug, Clone)]
pub struct Secret {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: SecretType,
    pub name: String,
    pub metadata: String,
    pub data: Vec<u8>,
    pub sync_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of a mutating operation recorded in the operation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

impl FromStr for OperationKind {
    type Err = KeepsakeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(KeepsakeError::Validation(format!(
                "unknown operation kind '{other}'"
            ))),
        }
    }
}

/// One append-only operation-log entry.
#[derive(Debug, Clone)]
pub struct OperationEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_id: Uuid,
    pub kind: OperationKind,
    pub instant: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Create/update request for a secret.  `data` stays a raw JSON value
/// until the declared type tells the codec which shape to expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRequest {
    #[serde(rename = "type")]
    pub kind: SecretType,
    pub name: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub metadata: String,
}

/// A secret with its payload decrypted for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: SecretType,
    pub name: String,
    pub data: SecretPayload,
    #[serde(default)]
    pub metadata: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_hash: String,
}

impl SecretResponse {
    /// Pair a stored row with its decrypted payload.
    pub fn from_secret(secret: Secret, data: SecretPayload) -> Self {
        Self {
            id: secret.id,
            kind: secret.kind,
            name: secret.name,
            data,
            metadata: secret.metadata,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
            sync_hash: secret.sync_hash,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsList {
    pub secrets: Vec<SecretResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub last_sync_time: DateTime<Utc>,
    #[serde(default)]
    pub client_hashes: HashMap<Uuid, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub updated_secrets: Vec<SecretResponse>,
    pub deleted_secrets: Vec<Uuid>,
    pub sync_time: DateTime<Utc>,
}
