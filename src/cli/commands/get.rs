//! `keepsake get` — decrypt and print a single secret.

use uuid::Uuid;

use crate::cli::{
    cancel_token, login_interactive, open_service, output, project_dir, prompt_master_password,
    Cli,
};
use crate::errors::{KeepsakeError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, username: &str, id: Uuid) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;
    let master = prompt_master_password()?;

    let secret = service.get_secret(id, session.user.id, &master, &cancel_token())?;

    output::info(&format!("{} ({})", secret.name, secret.kind));
    if !secret.metadata.is_empty() {
        output::tip(&secret.metadata);
    }
    let pretty = serde_json::to_string_pretty(&secret.data)
        .map_err(|e| KeepsakeError::Serialization(format!("payload: {e}")))?;
    println!("{pretty}");

    Ok(())
}
