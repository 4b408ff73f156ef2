//! The domain service: registration, login, and the secret lifecycle.
//!
//! Every mutating secret operation commits the store change and its
//! operation-log entry in one transaction, so the log never describes
//! a change that did not happen.  The master password arrives with the
//! request, is used for the codec, and is never stored or logged.

use tracing::{debug, info};
use uuid::Uuid;

use super::db::{self, Database};
use super::token::TokenSigner;
use super::{oplog, store, sync, users};
use crate::cancel::CancelToken;
use crate::errors::{KeepsakeError, Result};
use crate::models::{
    AuthSession, LoginRequest, OperationEntry, OperationKind, RegisterRequest, Secret,
    SecretRequest, SecretResponse, SecretsList, SyncRequest, SyncResponse, User,
};
use crate::payload::{self, SecretPayload};
use crate::crypto;

/// Minimum login-password length; trivially weak passwords are refused
/// before any KDF work.
const MIN_PASSWORD_LEN: usize = 8;

/// Username length bounds.
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

/// The server-side service facade.
pub struct SecretService {
    db: Database,
    tokens: TokenSigner,
}

impl SecretService {
    pub fn new(db: Database, tokens: TokenSigner) -> Self {
        Self { db, tokens }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Register a new user and log them in.
    pub fn register(&self, req: &RegisterRequest) -> Result<AuthSession> {
        validate_register(req)?;

        let conn = self.db.lock();
        if users::by_username(&conn, &req.username)?.is_some() {
            return Err(KeepsakeError::AlreadyExists);
        }

        let now = db::now();
        let user = User {
            id: Uuid::new_v4(),
            username: req.username.clone(),
            email: req.email.clone(),
            password_hash: crypto::hash_password(&req.password)?,
            created_at: now,
            updated_at: now,
        };
        users::insert(&conn, &user)?;
        drop(conn);

        info!(username = %user.username, "registered user");
        self.session_for(user)
    }

    /// Authenticate a username/password pair.
    ///
    /// A missing user and a wrong password are indistinguishable to the
    /// caller.
    pub fn login(&self, req: &LoginRequest) -> Result<AuthSession> {
        let conn = self.db.lock();
        let user = users::by_username(&conn, &req.username)?
            .ok_or(KeepsakeError::InvalidCredentials)?;
        drop(conn);

        if !crypto::verify_password(&req.password, &user.password_hash) {
            return Err(KeepsakeError::InvalidCredentials);
        }

        info!(username = %user.username, "login succeeded");
        self.session_for(user)
    }

    /// Resolve a bearer token to the principal it names.
    pub fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.tokens.verify(token)?;

        let conn = self.db.lock();
        users::by_id(&conn, claims.user_id)?.ok_or(KeepsakeError::Unauthorized)
    }

    fn session_for(&self, mut user: User) -> Result<AuthSession> {
        let token = self.tokens.issue(user.id, &user.username)?;
        // The verifier never travels in a session.
        user.password_hash = String::new();
        Ok(AuthSession { token, user })
    }

    // ------------------------------------------------------------------
    // Secrets
    // ------------------------------------------------------------------

    /// Create a secret and its `create` log entry atomically.
    pub fn create_secret(
        &self,
        user_id: Uuid,
        req: &SecretRequest,
        master_password: &str,
        cancel: &CancelToken,
    ) -> Result<SecretResponse> {
        cancel.check()?;
        let data = validate_secret_request(req)?;

        let (blob, sync_hash) = payload::encode(&data, master_password)?;
        let now = db::now();
        let secret = Secret {
            id: Uuid::new_v4(),
            user_id,
            kind: req.kind,
            name: req.name.clone(),
            metadata: req.metadata.clone(),
            data: blob,
            sync_hash,
            created_at: now,
            updated_at: now,
        };

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        store::insert(&tx, &secret)?;
        oplog::append(&tx, &log_entry(&secret, OperationKind::Create))?;
        tx.commit()?;

        debug!(secret_id = %secret.id, kind = %secret.kind, "created secret");
        Ok(SecretResponse::from_secret(secret, data))
    }

    /// Fetch and decrypt one secret.
    pub fn get_secret(
        &self,
        secret_id: Uuid,
        user_id: Uuid,
        master_password: &str,
        cancel: &CancelToken,
    ) -> Result<SecretResponse> {
        cancel.check()?;

        let conn = self.db.lock();
        let secret = store::by_id(&conn, secret_id, user_id)?.ok_or(KeepsakeError::NotFound)?;
        drop(conn);

        let data = payload::decode(&secret.data, secret.kind, master_password)?;
        Ok(SecretResponse::from_secret(secret, data))
    }

    /// List and decrypt all of a user's secrets.
    ///
    /// A secret that fails to decrypt is skipped, mirroring the sync
    /// engine's per-secret recovery.
    pub fn list_secrets(
        &self,
        user_id: Uuid,
        master_password: &str,
        cancel: &CancelToken,
    ) -> Result<SecretsList> {
        let conn = self.db.lock();
        let rows = store::list_by_user(&conn, user_id)?;
        drop(conn);

        let mut secrets = Vec::with_capacity(rows.len());
        for secret in rows {
            cancel.check()?;
            match payload::decode(&secret.data, secret.kind, master_password) {
                Ok(data) => secrets.push(SecretResponse::from_secret(secret, data)),
                Err(err) => {
                    debug!(secret_id = %secret.id, error = %err, "skipping undecodable secret in list");
                }
            }
        }

        let total = secrets.len();
        Ok(SecretsList { secrets, total })
    }

    /// Re-encrypt a secret in place and log the update atomically.
    ///
    /// The type tag is fixed at creation; a request that tries to
    /// change it is refused before any crypto work.
    pub fn update_secret(
        &self,
        secret_id: Uuid,
        user_id: Uuid,
        req: &SecretRequest,
        master_password: &str,
        cancel: &CancelToken,
    ) -> Result<SecretResponse> {
        cancel.check()?;

        let conn = self.db.lock();
        let mut secret = store::by_id(&conn, secret_id, user_id)?.ok_or(KeepsakeError::NotFound)?;
        drop(conn);

        if req.kind != secret.kind {
            return Err(KeepsakeError::Validation(format!(
                "secret type is fixed at creation (stored '{}', requested '{}')",
                secret.kind, req.kind
            )));
        }
        let data = validate_secret_request(req)?;

        let (blob, sync_hash) = payload::encode(&data, master_password)?;
        secret.name = req.name.clone();
        secret.metadata = req.metadata.clone();
        secret.data = blob;
        secret.sync_hash = sync_hash;
        secret.updated_at = db::now();

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        store::update(&tx, &secret)?;
        oplog::append(&tx, &log_entry(&secret, OperationKind::Update))?;
        tx.commit()?;

        debug!(secret_id = %secret.id, "updated secret");
        Ok(SecretResponse::from_secret(secret, data))
    }

    /// Delete a secret and log the tombstone atomically.
    pub fn delete_secret(
        &self,
        secret_id: Uuid,
        user_id: Uuid,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        store::delete(&tx, secret_id, user_id)?;
        oplog::append(
            &tx,
            &OperationEntry {
                id: Uuid::new_v4(),
                user_id,
                secret_id,
                kind: OperationKind::Delete,
                instant: db::now(),
            },
        )?;
        tx.commit()?;

        debug!(secret_id = %secret_id, "deleted secret");
        Ok(())
    }

    /// Reconcile a client against the operation log.
    pub fn sync(
        &self,
        user_id: Uuid,
        req: &SyncRequest,
        master_password: &str,
        cancel: &CancelToken,
    ) -> Result<SyncResponse> {
        cancel.check()?;

        let conn = self.db.lock();
        sync::process(&conn, user_id, req, master_password, cancel)
    }
}

/// Build the log entry matching a store mutation.  Its instant equals
/// the secret's new `updated_at`.
fn log_entry(secret: &Secret, kind: OperationKind) -> OperationEntry {
    OperationEntry {
        id: Uuid::new_v4(),
        user_id: secret.user_id,
        secret_id: secret.id,
        kind,
        instant: secret.updated_at,
    }
}

fn validate_register(req: &RegisterRequest) -> Result<()> {
    if !USERNAME_LEN.contains(&req.username.chars().count()) {
        return Err(KeepsakeError::Validation(
            "username must be 3-50 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(KeepsakeError::Validation("invalid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(KeepsakeError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Check the request shape and parse its payload against the declared
/// type before any crypto work.
fn validate_secret_request(req: &SecretRequest) -> Result<SecretPayload> {
    if req.name.trim().is_empty() {
        return Err(KeepsakeError::Validation("secret name is required".into()));
    }

    SecretPayload::from_value(req.kind, req.data.clone())
}
