//! Structured debug logging

use tracing_subscriber::EnvFilter;
use vidsense_core::VidsenseError;

/// Install the process-wide `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `fallback` is used as the filter. Returns
/// `Ok(false)` when a subscriber was already installed, so calling this more than once
/// is harmless.
pub fn init_logging(fallback: &str) -> Result<bool, VidsenseError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(fallback).map_err(|e| VidsenseError::InvalidConfiguration {
                message: format!("invalid log filter '{}': {}", fallback, e),
            })?
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();
    Ok(installed)
}
