//! Authenticated envelope encryption for secret payloads.
//!
//! Every blob carries its own random salt and nonce:
//!
//! ```text
//! [ 32-byte salt | 12-byte nonce | ciphertext + 16-byte auth tag ]
//! ```
//!
//! The salt feeds Argon2id, so cracking one envelope never amortizes
//! the KDF work across a user's other secrets.  `open` re-derives the
//! key from the embedded salt; the only input a caller needs besides
//! the blob is the master password.
//!
//! Nonces are random 96-bit values.  There is no single write
//! serializer in the system, so a counter nonce is not an option;
//! collision risk at per-user secret counts is negligible.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use zeroize::Zeroize;

use super::kdf::{derive_key, generate_salt, SALT_LEN};
use crate::errors::{KeepsakeError, Result};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Smallest blob that can carry a salt and a nonce.  Anything shorter
/// is malformed before any key derivation happens.
const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN;

/// Encrypt `plaintext` under a key derived from `password`.
///
/// Draws a fresh salt and nonce on every call, so two encryptions of
/// the same plaintext never produce the same blob.
pub fn seal(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    let salt = generate_salt();

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let mut key = derive_key(password.as_bytes(), &salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| KeepsakeError::EncryptionFailed(format!("invalid key length: {e}")))?;
    key.zeroize();

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| KeepsakeError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Concatenate so the caller only ever stores one blob.
    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by [`seal`].
///
/// A blob shorter than 44 bytes is `InvalidData`.  Everything else that
/// goes wrong (wrong password, flipped bits, truncated ciphertext)
/// surfaces as `DecryptionFailed` without distinguishing the cause.
pub fn open(blob: &[u8], password: &str) -> Result<Vec<u8>> {
    if blob.len() < MIN_BLOB_LEN {
        return Err(KeepsakeError::InvalidData);
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let mut key =
        derive_key(password.as_bytes(), salt).map_err(|_| KeepsakeError::DecryptionFailed)?;
    let cipher =
        Aes256Gcm::new_from_slice(&key).map_err(|_| KeepsakeError::DecryptionFailed)?;
    key.zeroize();

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| KeepsakeError::DecryptionFailed)
}
