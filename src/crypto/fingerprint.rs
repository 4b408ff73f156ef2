//! Content fingerprints for sync drift detection.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Compute the sync fingerprint of a ciphertext blob.
///
/// Pure function over the blob bytes: identical blobs hash identically,
/// and because every envelope carries a fresh salt and nonce, two
/// encryptions of the same plaintext fingerprint differently.  Always
/// 44 characters (base64 of 32 bytes, padded).
pub fn sync_hash(blob: &[u8]) -> String {
    BASE64.encode(Sha256::digest(blob))
}
