//! Cryptographic primitives: the password KDF, the envelope AEAD, the
//! login-password verifier, and the content fingerprint used by sync.

pub mod envelope;
pub mod fingerprint;
pub mod kdf;
pub mod password;

pub use envelope::{open, seal};
pub use fingerprint::sync_hash;
pub use kdf::{derive_key, generate_salt};
pub use password::{hash_password, verify_password};
