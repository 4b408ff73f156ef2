//! Project-level configuration, loaded from `keepsake.toml`.
//!
//! Every field has a sensible default so Keepsake works out-of-the-box
//! without any config file at all.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{KeepsakeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the server SQLite database.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding the client cache and the token signing secret.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Bearer token lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Log filter (tracing env-filter syntax, e.g. "info" or
    /// "keepsake=debug").
    #[serde(default = "default_log")]
    pub log: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_database_path() -> String {
    "keepsake.db".to_string()
}

fn default_data_dir() -> String {
    ".keepsake".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_log() -> String {
    "info".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            data_dir: default_data_dir(),
            token_ttl_hours: default_token_ttl_hours(),
            log: default_log(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = "keepsake.toml";

    /// Load settings from `<dir>/keepsake.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If it exists
    /// but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        toml::from_str(&contents).map_err(|e| {
            KeepsakeError::Config(format!("failed to parse {}: {e}", config_path.display()))
        })
    }

    pub fn database_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.database_path)
    }

    /// Directory for the client cache files.
    pub fn cache_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.data_dir).join("cache")
    }

    /// Path of the token signing secret (generated on first run).
    pub fn token_secret_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.data_dir).join("token.secret")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.database_path, "keepsake.db");
        assert_eq!(s.data_dir, ".keepsake");
        assert_eq!(s.token_ttl_hours, 24);
        assert_eq!(s.log, "info");
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.database_path, "keepsake.db");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
database_path = "server/secrets.db"
data_dir = ".ks"
token_ttl_hours = 8
log = "keepsake=debug"
"#;
        fs::write(tmp.path().join("keepsake.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.database_path, "server/secrets.db");
        assert_eq!(settings.data_dir, ".ks");
        assert_eq!(settings.token_ttl_hours, 8);
        assert_eq!(settings.log, "keepsake=debug");
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keepsake.toml"), "data_dir = \".k\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.data_dir, ".k");
        assert_eq!(settings.token_ttl_hours, 24);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keepsake.toml"), "not valid {{toml").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn derived_paths_land_under_the_project_dir() {
        let s = Settings::default();
        let dir = Path::new("/srv/keepsake");
        assert_eq!(s.database_path(dir), PathBuf::from("/srv/keepsake/keepsake.db"));
        assert_eq!(
            s.cache_dir(dir),
            PathBuf::from("/srv/keepsake/.keepsake/cache")
        );
        assert_eq!(
            s.token_secret_path(dir),
            PathBuf::from("/srv/keepsake/.keepsake/token.secret")
        );
    }
}
