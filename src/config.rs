//! # Configuration Management
//!
//! Centralized configuration for voice framing and handshake gating.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! Durations are written in milliseconds and log levels as lowercase strings:
//!
//! ```toml
//! [gate]
//! default_hold = 30000
//! max_concurrency = 1
//! ready_cooldown = 5000
//!
//! [codec]
//! mode = "xsalsa20_poly1305_lite"
//! max_datagram_size = 1460
//! ```

use crate::core::codec::DEFAULT_MAX_DATAGRAM_SIZE;
use crate::core::mode::EncryptionMode;
use crate::core::packet::packet_size;
use crate::error::{Result, VoiceError};
use crate::protocol::gate::DEFAULT_HOLD;
pub use crate::protocol::gate::DEFAULT_READY_COOLDOWN;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Whole milliseconds in `duration`, clamped to `u64::MAX`
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct VoiceConfig {
    /// Handshake gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Packet codec configuration
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VoiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable numbers are ignored; an unknown encryption mode is an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(hold) = std::env::var("VOICE_LINK_DEFAULT_HOLD_MS") {
            if let Ok(val) = hold.parse::<u64>() {
                config.gate.default_hold = Duration::from_millis(val);
            }
        }

        if let Ok(concurrency) = std::env::var("VOICE_LINK_MAX_CONCURRENCY") {
            if let Ok(val) = concurrency.parse::<usize>() {
                config.gate.max_concurrency = val;
            }
        }

        if let Ok(cooldown) = std::env::var("VOICE_LINK_READY_COOLDOWN_MS") {
            if let Ok(val) = cooldown.parse::<u64>() {
                config.gate.ready_cooldown = Duration::from_millis(val);
            }
        }

        if let Ok(mode) = std::env::var("VOICE_LINK_ENCRYPTION_MODE") {
            config.codec.mode = mode.parse()?;
        }

        if let Ok(size) = std::env::var("VOICE_LINK_MAX_DATAGRAM_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.codec.max_datagram_size = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| VoiceError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.gate.validate());
        errors.extend(self.codec.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(VoiceError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Handshake gate configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// How long an unextended hold keeps its permit
    #[serde(with = "duration_serde")]
    pub default_hold: Duration,

    /// Permits per owner when the server reports no limit
    /// (see `GateRegistry::get_or_create_reported`)
    pub max_concurrency: usize,

    /// Hold applied after a successful handshake when the server gives no delay
    /// (see `ConcurrencyGate::release_after_ready`)
    #[serde(with = "duration_serde")]
    pub ready_cooldown: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_hold: DEFAULT_HOLD,
            max_concurrency: 1,
            ready_cooldown: DEFAULT_READY_COOLDOWN,
        }
    }
}

impl GateConfig {
    /// Validate gate configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.default_hold.is_zero() {
            errors.push("Default hold must be greater than 0".to_string());
        } else if self.default_hold.as_secs() > 600 {
            errors.push("Default hold too long (maximum: 600s)".to_string());
        }

        if self.max_concurrency == 0 {
            errors.push("Max concurrency must be greater than 0".to_string());
        } else if self.max_concurrency > 1024 {
            errors.push(format!(
                "Max concurrency too large: {} (maximum: 1024)",
                self.max_concurrency
            ));
        }

        if self.ready_cooldown > self.default_hold {
            errors.push("Ready cooldown cannot be longer than the default hold".to_string());
        }

        errors
    }
}

/// Packet codec configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CodecConfig {
    /// Encryption mode used when the server offers no preference
    pub mode: EncryptionMode,

    /// Largest datagram the codec will emit
    pub max_datagram_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            mode: EncryptionMode::default(),
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let minimum = packet_size(1, self.mode);
        if self.max_datagram_size < minimum {
            errors.push(format!(
                "Max datagram size too small for {}: {} bytes (minimum: {minimum})",
                self.mode, self.max_datagram_size
            ));
        } else if self.max_datagram_size > 65_507 {
            errors.push(format!(
                "Max datagram size too large: {} bytes (UDP maximum: 65507)",
                self.max_datagram_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("voice-link"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::saturating_millis(*duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
