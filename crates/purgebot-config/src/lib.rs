use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "purgebot.json5";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Token file {0} is empty")]
    EmptyToken(PathBuf),
    #[error("UTC offset {0}h is out of range")]
    InvalidOffset(f64),
}

/// Top-level purgebot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// File holding the bot credential.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Offset of the scheduling clock from UTC, in (possibly fractional) hours.
    #[serde(default)]
    pub utc_offset_hours: f64,
}

fn default_token_file() -> PathBuf {
    PathBuf::from("./TOKEN")
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            utc_offset_hours: 0.0,
        }
    }
}

impl BotConfig {
    /// Resolve `utc_offset_hours` into a chrono offset.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        let hours = self.utc_offset_hours;
        if !hours.is_finite() {
            return Err(ConfigError::InvalidOffset(hours));
        }
        let secs = (hours * 3600.0).round() as i32;
        FixedOffset::east_opt(secs).ok_or(ConfigError::InvalidOffset(hours))
    }

    /// Read the bot credential from `token_file`.
    pub fn read_token(&self) -> Result<String, ConfigError> {
        read_token(&self.token_file)
    }
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when `None`.
pub fn load_config(path: Option<&Path>) -> Result<BotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    match path {
        Some(path) => load_config_from(path),
        None => load_config_from(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(BotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: BotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Read a credential file, trimming surrounding whitespace.
pub fn read_token(path: &Path) -> Result<String, ConfigError> {
    let token = std::fs::read_to_string(path)?.trim().to_string();
    if token.is_empty() {
        return Err(ConfigError::EmptyToken(path.to_path_buf()));
    }
    Ok(token)
}
