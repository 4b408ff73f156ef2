//! Login-password hashing and verification.
//!
//! The verifier stored server-side is `base64(salt(32) ‖ key(32))`,
//! 88 ASCII characters with padding, using the same Argon2id parameters
//! as envelope encryption.  No algorithm identifier is embedded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::kdf::{derive_key, generate_salt, KEY_LEN, SALT_LEN};
use crate::errors::Result;

/// Hash a login password for storage.
///
/// Draws a fresh salt, so two calls with the same password produce
/// different verifiers.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = generate_salt();
    let mut key = derive_key(password.as_bytes(), &salt)?;

    let mut buf = Vec::with_capacity(SALT_LEN + KEY_LEN);
    buf.extend_from_slice(&salt);
    buf.extend_from_slice(&key);
    key.zeroize();

    let verifier = BASE64.encode(&buf);
    buf.zeroize();
    Ok(verifier)
}

/// Verify a candidate password against a stored verifier.
///
/// Never errors: a malformed verifier simply fails verification.  The
/// comparison over the 32-byte derived key is constant-time.
pub fn verify_password(password: &str, verifier: &str) -> bool {
    let Ok(decoded) = BASE64.decode(verifier) else {
        return false;
    };
    if decoded.len() != SALT_LEN + KEY_LEN {
        return false;
    }

    let (salt, stored_key) = decoded.split_at(SALT_LEN);
    let Ok(mut candidate) = derive_key(password.as_bytes(), salt) else {
        return false;
    };

    let matches: bool = candidate.as_slice().ct_eq(stored_key).into();
    candidate.zeroize();
    matches
}
