//! `keepsake delete` — remove a secret and tombstone it for sync.

use uuid::Uuid;

use crate::cli::{cancel_token, io_err, login_interactive, open_service, output, project_dir, Cli};
use crate::errors::Result;

/// Execute the `delete` command.
pub fn execute(cli: &Cli, username: &str, id: Uuid, force: bool) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;

    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete secret {id}?"))
            .default(false)
            .interact()
            .map_err(io_err)?;
        if !confirmed {
            output::info("Aborted.");
            return Ok(());
        }
    }

    service.delete_secret(id, session.user.id, &cancel_token())?;
    output::success(&format!("Deleted {id}"));
    Ok(())
}
