//! The sync engine: reconcile a client against the operation log.
//!
//! Given the instant of the client's last successful sync, fold the
//! newer log entries into two disjoint sets: ids whose current secret
//! the client must fetch, and ids the client must drop.  A delete
//! tombstones its id for the rest of the window: nothing resurrects it,
//! even a same-instant create racing the clock's coarseness.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::warn;
use uuid::Uuid;

use super::{db, oplog, store};
use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::models::{OperationEntry, OperationKind, SecretResponse, SyncRequest, SyncResponse};
use crate::payload;

/// Compute a sync response for one user.
///
/// Per-secret decode failures are not fatal: the secret is logged and
/// omitted so one corrupted record cannot block the whole sync.
pub fn process(
    conn: &Connection,
    user_id: Uuid,
    req: &SyncRequest,
    master_password: &str,
    cancel: &CancelToken,
) -> Result<SyncResponse> {
    let entries = oplog::since(conn, user_id, req.last_sync_time)?;
    let (pending, deleted) = fold_entries(&entries);

    let mut updated = Vec::with_capacity(pending.len());
    for secret_id in pending {
        cancel.check()?;

        // The row can be gone if an out-of-band change raced the fold.
        let Some(secret) = store::by_id(conn, secret_id, user_id)? else {
            continue;
        };

        // Optional suppression: the client already holds these bytes.
        if req
            .client_hashes
            .get(&secret_id)
            .is_some_and(|hash| *hash == secret.sync_hash)
        {
            continue;
        }

        match payload::decode(&secret.data, secret.kind, master_password) {
            Ok(data) => updated.push(SecretResponse::from_secret(secret, data)),
            Err(err) => {
                warn!(secret_id = %secret_id, error = %err, "skipping undecodable secret during sync");
            }
        }
    }

    Ok(SyncResponse {
        updated_secrets: updated,
        deleted_secrets: deleted,
        sync_time: db::now(),
    })
}

/// Fold an ordered entry stream into `(pending update ids, deleted ids)`.
///
/// `pending` keeps first-seen order so responses are deterministic;
/// `deleted` keeps the order of first delete observation.  The two sets
/// are disjoint by construction.
fn fold_entries(entries: &[OperationEntry]) -> (Vec<Uuid>, Vec<Uuid>) {
    let mut pending: Vec<Uuid> = Vec::new();
    let mut tombstoned: HashSet<Uuid> = HashSet::new();
    let mut deleted: Vec<Uuid> = Vec::new();

    for entry in entries {
        match entry.kind {
            OperationKind::Create | OperationKind::Update => {
                if !tombstoned.contains(&entry.secret_id) && !pending.contains(&entry.secret_id) {
                    pending.push(entry.secret_id);
                }
            }
            OperationKind::Delete => {
                pending.retain(|id| *id != entry.secret_id);
                if tombstoned.insert(entry.secret_id) {
                    deleted.push(entry.secret_id);
                }
            }
        }
    }

    (pending, deleted)
}
