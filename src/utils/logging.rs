//! Structured logging setup
//!
//! Installs a global `tracing` subscriber from a [`LoggingConfig`]. `RUST_LOG`
//! takes precedence over the configured level when it is set.

use crate::config::LoggingConfig;
use crate::error::{Result, VoiceError};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the env filter: `RUST_LOG` if present, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_lowercase()))
}

/// Initialize the global subscriber.
///
/// # Errors
/// [`VoiceError::ConfigError`] if the configuration is invalid, the log file
/// cannot be opened, or a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(VoiceError::ConfigError(errors.join("; ")));
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.log_to_console {
        let console = fmt::layer().with_target(true);
        layers.push(if config.json_format {
            console.json().boxed()
        } else {
            console.boxed()
        });
    }

    if config.log_to_file {
        let path = config
            .log_file_path
            .as_deref()
            .ok_or_else(|| VoiceError::ConfigError("log_file_path is not set".to_string()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to open log file: {e}")))?;

        let to_file = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        layers.push(if config.json_format {
            to_file.json().boxed()
        } else {
            to_file.boxed()
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| VoiceError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
