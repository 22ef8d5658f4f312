use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the on-disk access token.
pub const TOKEN_ENV: &str = "TIMECARD_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no configuration directory available (set XDG_CONFIG_HOME or HOME)")]
    NoConfigDir,

    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no access token: set {TOKEN_ENV} or create {}", .path.display())]
    NoToken { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    pub calendar: Calendar,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Calendar {
    /// The identifier of the calendar to mine for tagged entries.
    pub id: String,
}

/// Returns the per-user configuration directory for this tool.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join("timecard"))
        .ok_or(ConfigError::NoConfigDir)
}

fn settings_path(dir: &Path) -> PathBuf {
    dir.join("config.toml")
}

fn token_path(dir: &Path) -> PathBuf {
    dir.join("token")
}

/// Loads the settings from `config.toml` inside the given directory.
pub fn load(dir: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path(dir);
    let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
}

/// Stores the settings into `config.toml`, creating the directory if needed.
pub fn store(dir: &Path, settings: &Settings) -> Result<(), ConfigError> {
    fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let serialized = toml::to_string_pretty(settings)?;
    let path = settings_path(dir);
    fs::write(&path, serialized).map_err(|source| ConfigError::Write { path, source })
}

/// Returns the calendar API access token.
///
/// The `TIMECARD_TOKEN` environment variable wins; otherwise the token is
/// read from the `token` file next to the settings.
pub fn access_token(dir: &Path) -> Result<String, ConfigError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    let path = token_path(dir);
    match fs::read_to_string(&path) {
        Ok(token) => Ok(token.trim().to_string()),
        Err(_) => Err(ConfigError::NoToken { path }),
    }
}
