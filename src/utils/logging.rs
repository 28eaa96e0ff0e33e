/// Tracing subscriber setup
use tracing_subscriber::EnvFilter;

use crate::error::{PriceError, Result};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pricecorr={},{}", level, level)));

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
    };

    installed.map_err(|e| PriceError::ConfigError(format!("Failed to initialise logging: {}", e)))
}
