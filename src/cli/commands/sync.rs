//! `keepsake sync` — reconcile the device cache against the store.

use std::path::PathBuf;

use crate::cli::{
    cancel_token, login_interactive, open_service, output, project_dir, prompt_master_password,
    Cli,
};
use crate::client::LocalCache;
use crate::errors::Result;
use crate::models::SyncRequest;

/// Execute the `sync` command.
pub fn execute(cli: &Cli, username: &str, cache_dir: Option<&str>) -> Result<()> {
    let dir = project_dir(cli);
    let (settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;
    let master = prompt_master_password()?;

    // One cache per account, so two users on one machine never mix.
    // `--cache-dir` overrides the configured location wholesale.
    let cache_path = match cache_dir {
        Some(override_dir) => PathBuf::from(override_dir),
        None => settings.cache_dir(&dir).join(username),
    };
    let cache = LocalCache::open(&cache_path)?;

    let req = SyncRequest {
        last_sync_time: cache.last_sync(),
        client_hashes: cache.hashes(),
    };
    let response = service.sync(session.user.id, &req, &master, &cancel_token())?;
    cache.apply_sync(&response)?;

    output::success(&format!(
        "Synced: {} updated, {} deleted",
        response.updated_secrets.len(),
        response.deleted_secrets.len()
    ));
    output::tip(&format!("Cache now holds {} secrets.", cache.secrets().len()));
    Ok(())
}
