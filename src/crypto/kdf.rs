//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The parameters below are fixed constants for the
//! lifetime of every ciphertext and verifier: they are not encoded in
//! the blob, so changing them is a breaking format change.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::errors::{KeepsakeError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Argon2id memory cost in KiB (64 MiB).
const MEMORY_KIB: u32 = 65_536;

/// Argon2id iteration count.
const ITERATIONS: u32 = 3;

/// Argon2id parallelism lanes.
const PARALLELISM: u32 = 4;

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// Deterministic: the same password + salt always produce the same key.
/// A single derivation costs tens of milliseconds of CPU and 64 MiB of
/// memory, which is the point.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| KeepsakeError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| KeepsakeError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
