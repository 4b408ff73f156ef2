//! `keepsake register` — create a new account.

use crate::cli::{open_service, output, project_dir, prompt_new_password, Cli};
use crate::errors::Result;
use crate::models::RegisterRequest;

/// Execute the `register` command.
pub fn execute(cli: &Cli, username: &str, email: &str) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let password = prompt_new_password(&format!("Password for {username}"))?;
    let session = service.register(&RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    })?;

    output::success(&format!(
        "Registered '{}' ({})",
        session.user.username, session.user.id
    ));
    output::tip("Run `keepsake add` to store your first secret.");
    Ok(())
}
