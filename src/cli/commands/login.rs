//! `keepsake login` — authenticate and print a bearer token.

use crate::cli::{login_interactive, open_service, output, project_dir, Cli};
use crate::errors::Result;

/// Execute the `login` command.
pub fn execute(cli: &Cli, username: &str) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;

    output::success(&format!("Logged in as '{}'", session.user.username));
    // The token goes to stdout so scripts can capture it.
    println!("{}", session.token);
    Ok(())
}
