use thiserror::Error;

/// All errors that can occur in Keepsake.
///
/// Crypto failures are deliberately coarse: a wrong master password and
/// a tampered blob both surface as `DecryptionFailed`, and callers map
/// them to an auth-style response without distinguishing the cause.
#[derive(Debug, Error)]
pub enum KeepsakeError {
    // --- Crypto errors ---
    #[error("invalid encrypted data")]
    InvalidData,

    #[error("decryption failed — wrong master password or corrupted data")]
    DecryptionFailed,

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Payload errors ---
    #[error("payload does not match secret type '{0}'")]
    MalformedPayload(String),

    // --- Domain errors ---
    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("validation failed: {0}")]
    Validation(String),

    // --- Infrastructure errors ---
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience type alias for Keepsake results.
pub type Result<T> = std::result::Result<T, KeepsakeError>;
