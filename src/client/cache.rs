//! The device-local secret cache.
//!
//! One in-memory map behind a reader-writer lock, persisted as a single
//! JSON file with restrictive permissions.  Persistence is always a
//! full-file rewrite through a temp file + rename; the cache is sized
//! in kilobytes and simplicity beats incremental updates.
//!
//! The cache stores decrypted `SecretResponse`s with their server
//! fingerprints, plus the instant of the last successful sync.  The
//! fingerprints feed `SyncRequest.client_hashes`, which also lets a
//! device recognize echoes of its own writes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{KeepsakeError, Result};
use crate::models::{SecretResponse, SyncResponse};

/// On-disk shape of the cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    secrets: HashMap<Uuid, SecretResponse>,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
}

/// The local cache handle.
pub struct LocalCache {
    path: PathBuf,
    inner: RwLock<CacheFile>,
}

impl LocalCache {
    const FILE_NAME: &'static str = "secrets.json";

    /// Open (or create) the cache under `data_dir`.
    ///
    /// A missing cache file is normal for a first run; a present but
    /// unparsable one is an error rather than silent data loss.
    pub fn open(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(Self::FILE_NAME);

        let inner = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes)
                .map_err(|e| KeepsakeError::Serialization(format!("cache file: {e}")))?
        } else {
            CacheFile::default()
        };

        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All cached secrets, in no particular order.
    pub fn secrets(&self) -> Vec<SecretResponse> {
        self.read().secrets.values().cloned().collect()
    }

    pub fn secret(&self, id: Uuid) -> Option<SecretResponse> {
        self.read().secrets.get(&id).cloned()
    }

    /// Fingerprints of everything the device holds, for the next
    /// sync request.
    pub fn hashes(&self) -> HashMap<Uuid, String> {
        self.read()
            .secrets
            .iter()
            .map(|(id, secret)| (*id, secret.sync_hash.clone()))
            .collect()
    }

    /// The stored last-sync instant; the epoch before any sync.
    pub fn last_sync(&self) -> DateTime<Utc> {
        self.read().last_sync.unwrap_or(DateTime::UNIX_EPOCH)
    }

    // ------------------------------------------------------------------
    // Writes (each persists before returning)
    // ------------------------------------------------------------------

    /// Insert or replace one secret.
    pub fn upsert(&self, secret: SecretResponse) -> Result<()> {
        let mut inner = self.write();
        inner.secrets.insert(secret.id, secret);
        self.persist(&inner)
    }

    /// Drop one secret.  Removing an absent id is a no-op.
    pub fn remove(&self, id: Uuid) -> Result<()> {
        let mut inner = self.write();
        inner.secrets.remove(&id);
        self.persist(&inner)
    }

    /// Fold a sync response into the cache and record its instant.
    pub fn apply_sync(&self, response: &SyncResponse) -> Result<()> {
        let mut inner = self.write();
        for secret in &response.updated_secrets {
            inner.secrets.insert(secret.id, secret.clone());
        }
        for id in &response.deleted_secrets {
            inner.secrets.remove(id);
        }
        inner.last_sync = Some(response.sync_time);
        self.persist(&inner)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Full-file rewrite: temp file in the same directory, then rename,
    /// so readers never see a half-written cache.
    fn persist(&self, inner: &CacheFile) -> Result<()> {
        let json = serde_json::to_vec_pretty(inner)
            .map_err(|e| KeepsakeError::Serialization(format!("cache file: {e}")))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
        ));

        fs::write(&tmp_path, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheFile> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheFile> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
