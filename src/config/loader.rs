/// Configuration loading from TOML file
use std::path::Path;
use tracing::info;

use crate::error::{PriceError, Result};
use crate::types::Config;

const MAX_RETENTION_SECS: i64 = 10 * 365 * 24 * 3600;
const MAX_TOLERANCE_SECS: i64 = 24 * 3600;
const MAX_WINDOW_MINUTES: i64 = 10 * 365 * 24 * 60;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PriceError::ConfigError(format!("Failed to read config file: {}", e)))?;

    parse_config(&content)
}

/// Load the config file if present, otherwise fall back to defaults
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config> {
    if !path.as_ref().exists() {
        info!("No config file at {} - using defaults", path.as_ref().display());
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| PriceError::ConfigError(format!("Failed to parse config: {}", e)))?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<()> {
    if config.retention_secs <= 0 || config.retention_secs > MAX_RETENTION_SECS {
        return Err(PriceError::ConfigError(
            format!("Invalid retention_secs: {}", config.retention_secs)
        ));
    }

    if config.alignment_tolerance_secs < 0 || config.alignment_tolerance_secs > MAX_TOLERANCE_SECS {
        return Err(PriceError::ConfigError(
            format!("Invalid alignment_tolerance_secs: {}", config.alignment_tolerance_secs)
        ));
    }

    if config.default_window_minutes <= 0 || config.default_window_minutes > MAX_WINDOW_MINUTES {
        return Err(PriceError::ConfigError(
            format!("Invalid default_window_minutes: {}", config.default_window_minutes)
        ));
    }

    if config.log_level.is_empty() {
        return Err(PriceError::ConfigError("log_level is empty".to_string()));
    }

    if let Some(path) = &config.journal_path {
        if path.is_empty() {
            return Err(PriceError::ConfigError("journal_path is empty".to_string()));
        }
    }

    Ok(())
}
