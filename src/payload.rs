//! Typed secret payloads and the codec that moves them through the
//! envelope.
//!
//! A payload serializes to the bare JSON object of its variant, with no
//! discriminator inside the ciphertext.  The `Secret.type` column is
//! the discriminator, and decoding asks for it explicitly: a blob that
//! opens fine but whose JSON does not match the declared type is a
//! `MalformedPayload`, not a crypto failure.

use serde::{Deserialize, Serialize};

use crate::crypto::{envelope, fingerprint};
use crate::errors::{KeepsakeError, Result};
use crate::models::SecretType;

/// Login/password pair, optionally with the site it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsData {
    pub name: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// An opaque file.  `data` travels as base64 text in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryData {
    pub name: String,
    pub filename: String,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// A payment card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    pub name: String,
    pub number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub cvv: String,
    pub holder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// A decrypted secret payload.  Serializes untagged: the wire and the
/// ciphertext both carry the bare variant object.
///
/// Untagged deserialization is unambiguous because every variant has a
/// distinct set of required fields (`username`/`password`, `content`,
/// `filename`/`data`, `number`/`cvv`/`holder`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretPayload {
    Credentials(CredentialsData),
    Text(TextData),
    Binary(BinaryData),
    Card(CardData),
}

impl SecretPayload {
    /// The type tag this payload must be stored under.
    pub fn kind(&self) -> SecretType {
        match self {
            SecretPayload::Credentials(_) => SecretType::Credentials,
            SecretPayload::Text(_) => SecretType::Text,
            SecretPayload::Binary(_) => SecretType::Binary,
            SecretPayload::Card(_) => SecretType::Card,
        }
    }

    /// Parse a JSON value into the variant the declared type demands.
    ///
    /// This is the decode half of the discriminator-driven codec: the
    /// type tag picks the shape, and a value that does not fit it is a
    /// `MalformedPayload` even if it would fit another variant.
    pub fn from_value(kind: SecretType, value: serde_json::Value) -> Result<Self> {
        let malformed = || KeepsakeError::MalformedPayload(kind.as_str().to_string());

        let payload = match kind {
            SecretType::Credentials => SecretPayload::Credentials(
                serde_json::from_value(value).map_err(|_| malformed())?,
            ),
            SecretType::Text => {
                SecretPayload::Text(serde_json::from_value(value).map_err(|_| malformed())?)
            }
            SecretType::Binary => {
                SecretPayload::Binary(serde_json::from_value(value).map_err(|_| malformed())?)
            }
            SecretType::Card => {
                SecretPayload::Card(serde_json::from_value(value).map_err(|_| malformed())?)
            }
        };
        payload.validate().map_err(|_| malformed())?;
        Ok(payload)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if let SecretPayload::Card(card) = self {
            if !(1..=12).contains(&card.expiry_month) {
                return Err(KeepsakeError::Validation(format!(
                    "card expiry month must be 1-12, got {}",
                    card.expiry_month
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Codec: payload ⇄ envelope
// ---------------------------------------------------------------------------

/// Serialize a payload to canonical JSON, seal it under the master
/// password, and fingerprint the resulting blob.
pub fn encode(payload: &SecretPayload, master_password: &str) -> Result<(Vec<u8>, String)> {
    let plain = serde_json::to_vec(payload)
        .map_err(|e| KeepsakeError::Serialization(format!("payload: {e}")))?;

    let blob = envelope::seal(&plain, master_password)?;
    let hash = fingerprint::sync_hash(&blob);
    Ok((blob, hash))
}

/// Open a blob and parse it as the declared type.
///
/// The stored blob is never touched: decoding is a pure read, and the
/// fingerprint stays whatever was computed at write time.
pub fn decode(blob: &[u8], kind: SecretType, master_password: &str) -> Result<SecretPayload> {
    let plain = envelope::open(blob, master_password)?;

    let value: serde_json::Value = serde_json::from_slice(&plain)
        .map_err(|_| KeepsakeError::MalformedPayload(kind.as_str().to_string()))?;

    SecretPayload::from_value(kind, value)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
