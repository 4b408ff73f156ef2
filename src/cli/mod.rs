//! CLI module — Clap argument parser, output helpers, and command
//! implementations.
//!
//! Commands drive the domain service against the local database; the
//! login password authenticates the principal and the master password
//! (prompted separately, never stored) unlocks payloads.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::cancel::CancelToken;
use crate::config::Settings;
use crate::errors::{KeepsakeError, Result};
use crate::models::{AuthSession, LoginRequest, SecretType};
use crate::server::{token, Database, SecretService, TokenSigner};

/// Keepsake CLI: encrypted secrets with cross-device sync.
#[derive(Parser)]
#[command(
    name = "keepsake",
    about = "Encrypted secrets manager with cross-device sync",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project directory holding keepsake.toml and the data files
    #[arg(long, default_value = ".", global = true)]
    pub dir: String,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Register a new account (prompts for a password)
    Register {
        /// Account name
        #[arg(short, long)]
        username: String,
        /// Contact e-mail
        #[arg(short, long)]
        email: String,
    },

    /// Log in and print a bearer token
    Login {
        #[arg(short, long)]
        username: String,
    },

    /// Store a new secret
    Add {
        #[arg(short, long)]
        username: String,
        /// Secret type: credentials, text, binary, or card
        #[arg(short = 't', long = "type")]
        kind: SecretType,
        /// Human-readable secret name
        #[arg(short, long)]
        name: String,
        /// Optional plaintext metadata (stored unencrypted)
        #[arg(short, long)]
        metadata: Option<String>,
        /// Payload as a JSON object (prompts interactively if omitted)
        #[arg(long)]
        data: Option<String>,
        /// File to store (binary secrets only)
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Decrypt and print one secret
    Get {
        #[arg(short, long)]
        username: String,
        /// Secret id
        #[arg(short, long)]
        id: Uuid,
    },

    /// List all secrets
    List {
        #[arg(short, long)]
        username: String,
    },

    /// Delete a secret
    Delete {
        #[arg(short, long)]
        username: String,
        /// Secret id
        #[arg(short, long)]
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Reconcile the local cache against the server store
    Sync {
        #[arg(short, long)]
        username: String,
        /// Override the cache directory (default: <data_dir>/cache/<username>)
        #[arg(long)]
        cache_dir: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by the command modules
// ---------------------------------------------------------------------------

pub fn project_dir(cli: &Cli) -> PathBuf {
    PathBuf::from(&cli.dir)
}

/// Build the service from the project directory's settings.
pub fn open_service(dir: &Path) -> Result<(Settings, SecretService)> {
    let settings = Settings::load(dir)?;
    let db = Database::open(&settings.database_path(dir))?;
    let secret = token::load_or_generate_secret(&settings.token_secret_path(dir))?;
    let signer = TokenSigner::new(secret, settings.token_ttl_hours);
    Ok((settings, SecretService::new(db, signer)))
}

/// Prompt for a password without echoing it.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(io_err)?;
    Ok(Zeroizing::new(password))
}

/// Prompt for a new password, typed twice.
pub fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let password = dialoguer::Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(io_err)?;
    Ok(Zeroizing::new(password))
}

/// Prompt for the master password that unlocks payloads.
pub fn prompt_master_password() -> Result<Zeroizing<String>> {
    prompt_password("Master password")
}

/// Authenticate a username by prompting for its login password.
pub fn login_interactive(service: &SecretService, username: &str) -> Result<AuthSession> {
    let password = prompt_password(&format!("Login password for {username}"))?;
    service.login(&LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// One token per CLI invocation; nothing ever fires it interactively,
/// but every service call still threads it through.
pub fn cancel_token() -> CancelToken {
    CancelToken::new()
}

/// Prompt for a required free-text value.
pub(crate) fn prompt_input(prompt: &str) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(io_err)
}

/// Prompt for an optional value; empty input becomes `None`.
pub(crate) fn prompt_input_optional(prompt: &str) -> Result<Option<String>> {
    let value = dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(io_err)?;
    Ok((!value.is_empty()).then_some(value))
}

pub(crate) fn io_err(e: dialoguer::Error) -> KeepsakeError {
    match e {
        dialoguer::Error::IO(io) => KeepsakeError::Io(io),
    }
}
