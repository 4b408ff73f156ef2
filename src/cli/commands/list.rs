//! `keepsake list` — table of all stored secrets.

use crate::cli::{
    cancel_token, login_interactive, open_service, output, project_dir, prompt_master_password,
    Cli,
};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, username: &str) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;
    let master = prompt_master_password()?;

    let list = service.list_secrets(session.user.id, &master, &cancel_token())?;
    output::print_secrets_table(&list.secrets);

    Ok(())
}
