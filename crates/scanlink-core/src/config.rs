//! Application configuration management.
//!
//! Handles loading, saving, and validating scanlink configuration:
//! - Scan defaults (timeout, duplicates, platform scan options)
//! - HTTP server bind address
//! - Logging level and output mode
//!
//! Values are layered: built-in defaults, then the TOML file, then
//! `SCANLINK__<SECTION>__<KEY>` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{MatchMode, ScanMode, ScanOptions, ScanRequest};

/// Prefix of environment variables overriding file values.
pub const ENV_PREFIX: &str = "SCANLINK";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors raised while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Layered sources could not be merged or deserialized.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// No platform configuration directory could be determined.
    #[error("Cannot determine config directory")]
    NoConfigDirectory,

    /// One field holds an invalid value.
    #[error("Invalid value for '{field}': {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanlinkConfig {
    /// Defaults applied to scan requests.
    pub scan: ScanDefaults,

    /// HTTP server settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Defaults applied to scan requests that leave a field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    /// Timeout in seconds; 0 scans until stopped.
    pub timeout_secs: u32,

    /// Report repeated advertisements from the same device.
    pub allow_duplicates: bool,

    /// Advertisements per filter the hardware should match (1-3).
    pub number_of_matches: u8,

    /// Match mode code (1 = aggressive, 2 = sticky).
    pub match_mode: u8,

    /// Scan mode code (-1 = opportunistic, 0 = low power, 1 = balanced, 2 = low latency).
    pub scan_mode: i8,

    /// Result batching delay in milliseconds.
    pub report_delay_ms: u64,

    /// Events buffered per event-stream subscriber.
    pub event_buffer: usize,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            allow_duplicates: false,
            number_of_matches: 3,
            match_mode: MatchMode::Aggressive.code(),
            scan_mode: ScanMode::LowPower.code(),
            report_delay_ms: 0,
            event_buffer: 256,
        }
    }
}

impl ScanDefaults {
    /// Platform scan options built from these defaults.
    ///
    /// Unknown mode codes fall back to the built-in defaults; [`ScanlinkConfig::validate`]
    /// rejects them before they get here.
    #[must_use]
    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            number_of_matches: self.number_of_matches,
            match_mode: MatchMode::from_code(self.match_mode).unwrap_or_default(),
            scan_mode: ScanMode::from_code(self.scan_mode).unwrap_or_default(),
            report_delay_ms: self.report_delay_ms,
        }
    }

    /// An unfiltered scan request using only these defaults.
    #[must_use]
    pub fn request(&self) -> ScanRequest {
        ScanRequest {
            service_uuids: Vec::new(),
            timeout_secs: self.timeout_secs,
            allow_duplicates: self.allow_duplicates,
            options: self.options(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_address: String,

    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither `RUST_LOG` nor `SCANLINK_LOG_LEVEL` is set.
    pub level: String,

    /// JSON file logs plus compact stdout instead of pretty stdout.
    pub production: bool,

    /// Directory for rolling log files; platform default when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            production: false,
            directory: None,
        }
    }
}

impl ScanlinkConfig {
    /// Load configuration from `path`, layering environment overrides on top.
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let loaded: Self = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Load configuration from [`default_config_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined or loading fails.
    pub fn load_default() -> ConfigResult<Self> {
        Self::load(&default_config_path()?)
    }

    /// Write configuration to `path` as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns a single [`ConfigError::ValidationError`] or a
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if !(1..=3).contains(&self.scan.number_of_matches) {
            errors.push(ConfigError::invalid(
                "scan.number_of_matches",
                "must be between 1 and 3",
            ));
        }
        if MatchMode::from_code(self.scan.match_mode).is_none() {
            errors.push(ConfigError::invalid(
                "scan.match_mode",
                "must be 1 (aggressive) or 2 (sticky)",
            ));
        }
        if ScanMode::from_code(self.scan.scan_mode).is_none() {
            errors.push(ConfigError::invalid(
                "scan.scan_mode",
                "must be between -1 and 2",
            ));
        }
        if self.scan.event_buffer == 0 {
            errors.push(ConfigError::invalid(
                "scan.event_buffer",
                "must be greater than 0",
            ));
        }
        if self.server.port == 0 {
            errors.push(ConfigError::invalid("server.port", "must be non-zero"));
        }
        if self.server.bind_address.trim().is_empty() {
            errors.push(ConfigError::invalid(
                "server.bind_address",
                "must not be empty",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            errors.push(ConfigError::invalid(
                "logging.level",
                format!("must be one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Get the configuration file path.
///
/// On Linux: `/etc/scanlink/config.toml`
/// Elsewhere: the platform config directory, e.g. `~/.config/scanlink/config.toml`
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDirectory`] if no home directory is known.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/etc/scanlink/config.toml"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let dirs = directories::ProjectDirs::from("", "", "scanlink")
            .ok_or(ConfigError::NoConfigDirectory)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}
