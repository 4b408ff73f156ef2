//! `keepsake add` — encrypt and store a new secret.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::cli::{
    login_interactive, open_service, output, project_dir, prompt_input, prompt_input_optional,
    prompt_master_password, prompt_password, Cli,
};
use crate::cli::cancel_token;
use crate::errors::{KeepsakeError, Result};
use crate::models::{SecretRequest, SecretType};

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    username: &str,
    kind: SecretType,
    name: &str,
    metadata: Option<&str>,
    data: Option<&str>,
    file: Option<&str>,
) -> Result<()> {
    let dir = project_dir(cli);
    let (_settings, service) = open_service(&dir)?;

    let session = login_interactive(&service, username)?;
    let value = payload_value(kind, name, data, file)?;
    let master = prompt_master_password()?;

    let req = SecretRequest {
        kind,
        name: name.to_string(),
        data: value,
        metadata: metadata.unwrap_or_default().to_string(),
    };
    let created = service.create_secret(session.user.id, &req, &master, &cancel_token())?;

    output::success(&format!(
        "Stored {} secret '{}' ({})",
        created.kind, created.name, created.id
    ));
    Ok(())
}

/// Assemble the payload JSON: from `--data`, from `--file` (binary), or
/// interactively by type.
fn payload_value(
    kind: SecretType,
    name: &str,
    data: Option<&str>,
    file: Option<&str>,
) -> Result<serde_json::Value> {
    if let Some(raw) = data {
        return serde_json::from_str(raw)
            .map_err(|e| KeepsakeError::Validation(format!("--data is not valid JSON: {e}")));
    }

    match kind {
        SecretType::Credentials => {
            let login = prompt_input("Username")?;
            let password = prompt_password("Password")?;
            let url = prompt_input_optional("URL (optional)")?;
            Ok(serde_json::json!({
                "name": name,
                "username": login,
                "password": password.to_string(),
                "url": url,
            }))
        }
        SecretType::Text => {
            let content = prompt_input("Content")?;
            Ok(serde_json::json!({ "name": name, "content": content }))
        }
        SecretType::Binary => {
            let path = file.ok_or_else(|| {
                KeepsakeError::Validation("binary secrets need --file <path>".into())
            })?;
            let bytes = std::fs::read(path)?;
            let filename = std::path::Path::new(path)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            Ok(serde_json::json!({
                "name": name,
                "filename": filename,
                "data": BASE64.encode(&bytes),
            }))
        }
        SecretType::Card => {
            let number = prompt_input("Card number")?;
            let expiry_month: u8 = parse_prompt("Expiry month (1-12)")?;
            let expiry_year: u16 = parse_prompt("Expiry year")?;
            let cvv = prompt_password("CVV")?;
            let holder = prompt_input("Holder name")?;
            let bank = prompt_input_optional("Bank (optional)")?;
            Ok(serde_json::json!({
                "name": name,
                "number": number,
                "expiry_month": expiry_month,
                "expiry_year": expiry_year,
                "cvv": cvv.to_string(),
                "holder": holder,
                "bank": bank,
            }))
        }
    }
}

fn parse_prompt<T: std::str::FromStr>(prompt: &str) -> Result<T> {
    let raw = prompt_input(prompt)?;
    raw.trim()
        .parse()
        .map_err(|_| KeepsakeError::Validation(format!("'{raw}' is not a valid number")))
}
