//! Bearer tokens: HMAC-SHA256 signed claims.
//!
//! Layout: `base64url(claims JSON) '.' base64url(mac)`.  Claims carry
//! the user id, username, and issue/expiry instants.  Verification
//! recomputes the MAC over the exact claim bytes (constant-time
//! comparison) before the JSON is trusted, then checks expiry.  The
//! server stores nothing per token.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::errors::{KeepsakeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of a generated signing secret in bytes (256 bits).
const SECRET_LEN: usize = 32;

/// Claims embedded in a token.  `iat` and `exp` are unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates bearer tokens for one signing secret.
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, ttl_hours: i64) -> Self {
        Self {
            secret,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token for an authenticated principal.
    pub fn issue(&self, user_id: Uuid, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let body = serde_json::to_vec(&claims)
            .map_err(|e| KeepsakeError::Serialization(format!("claims: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| KeepsakeError::Serialization(format!("mac key: {e}")))?;
        mac.update(&body);
        let tag = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            BASE64URL.encode(&body),
            BASE64URL.encode(tag)
        ))
    }

    /// Validate a token and return its claims.
    ///
    /// Every failure mode (bad framing, bad MAC, bad JSON, expired)
    /// collapses into `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let (body_b64, tag_b64) = token.split_once('.').ok_or(KeepsakeError::Unauthorized)?;

        let body = BASE64URL
            .decode(body_b64)
            .map_err(|_| KeepsakeError::Unauthorized)?;
        let tag = BASE64URL
            .decode(tag_b64)
            .map_err(|_| KeepsakeError::Unauthorized)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| KeepsakeError::Unauthorized)?;
        mac.update(&body);
        mac.verify_slice(&tag)
            .map_err(|_| KeepsakeError::Unauthorized)?;

        // Only MAC-verified bytes get parsed.
        let claims: Claims =
            serde_json::from_slice(&body).map_err(|_| KeepsakeError::Unauthorized)?;

        if claims.exp < Utc::now().timestamp() {
            return Err(KeepsakeError::Unauthorized);
        }
        Ok(claims)
    }
}

/// Load the signing secret from `path`, generating and persisting a
/// fresh one (0600) on first run.
pub fn load_or_generate_secret(path: &Path) -> Result<Vec<u8>> {
    if path.exists() {
        let encoded = std::fs::read_to_string(path)?;
        return BASE64URL
            .decode(encoded.trim())
            .map_err(|e| KeepsakeError::Config(format!("token secret file: {e}")));
    }

    let mut secret = vec![0u8; SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut secret);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, BASE64URL.encode(&secret))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-signing-secret".to_vec(), 24)
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let signer = signer();
        let user_id = Uuid::new_v4();

        let token = signer.issue(user_id, "alice").unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_unauthorized() {
        let signer = signer();
        let token = signer.issue(Uuid::new_v4(), "alice").unwrap();

        // Flip a character in the claims half.
        let mut bytes = token.into_bytes();
        bytes[0] = if bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            signer.verify(&tampered),
            Err(KeepsakeError::Unauthorized)
        ));
    }

    #[test]
    fn token_from_another_secret_is_unauthorized() {
        let token = signer().issue(Uuid::new_v4(), "alice").unwrap();
        let other = TokenSigner::new(b"a-different-secret".to_vec(), 24);

        assert!(matches!(
            other.verify(&token),
            Err(KeepsakeError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let signer = TokenSigner::new(b"test-signing-secret".to_vec(), -1);
        let token = signer.issue(Uuid::new_v4(), "alice").unwrap();

        assert!(matches!(
            signer.verify(&token),
            Err(KeepsakeError::Unauthorized)
        ));
    }

    #[test]
    fn garbage_tokens_are_unauthorized() {
        let signer = signer();
        for bad in ["", "no-dot", "a.b.c", "!!!.###"] {
            assert!(matches!(
                signer.verify(bad),
                Err(KeepsakeError::Unauthorized)
            ));
        }
    }

    #[test]
    fn secret_is_generated_once_and_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.secret");

        let first = load_or_generate_secret(&path).unwrap();
        let second = load_or_generate_secret(&path).unwrap();

        assert_eq!(first.len(), SECRET_LEN);
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn secret_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.secret");
        load_or_generate_secret(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
