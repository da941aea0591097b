//! Client Configuration
//!
//! Centralized configuration for the conversation core, with an optional TOML
//! file at `~/.config/course-chat/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (passed in as [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:5000"
//! connect_timeout_ms = 10000
//! request_timeout_ms = 10000
//!
//! [streaming]
//! first_byte_timeout_ms = 30000
//! inter_chunk_timeout_ms = 30000
//! channel_capacity = 100
//!
//! [input]
//! max_message_bytes = 102400
//! ```
//!
//! # Environment Variables
//!
//! - `COURSE_CHAT_BASE_URL`
//! - `COURSE_CHAT_FIRST_BYTE_TIMEOUT_MS`
//! - `COURSE_CHAT_INTER_CHUNK_TIMEOUT_MS`
//! - `COURSE_CHAT_MAX_MESSAGE_BYTES`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Backend base URL
    pub base_url: Option<String>,

    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Catalogue request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
}

/// Streaming section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingToml {
    /// Bound for response headers and the first body chunk
    pub first_byte_timeout_ms: Option<u64>,

    /// Bound for the gap between two body chunks
    pub inter_chunk_timeout_ms: Option<u64>,

    /// Capacity of the request task's signal channel
    pub channel_capacity: Option<usize>,
}

/// Input section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputToml {
    /// Largest accepted free-text message in bytes
    pub max_message_bytes: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Server section
    pub server: ServerToml,

    /// Streaming section
    pub streaming: StreamingToml,

    /// Input section
    pub input: InputToml,
}

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL
    pub base_url: Option<String>,
    /// First-byte timeout in milliseconds
    pub first_byte_timeout_ms: Option<u64>,
    /// Inter-chunk timeout in milliseconds
    pub inter_chunk_timeout_ms: Option<u64>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend base URL
    pub base_url: String,
    /// Where `base_url` came from
    pub base_url_source: ConfigSource,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Catalogue request timeout
    pub request_timeout: Duration,
    /// Bound for response headers and the first body chunk
    pub first_byte_timeout: Duration,
    /// Bound for the gap between two body chunks
    pub inter_chunk_timeout: Duration,
    /// Capacity of the request task's signal channel
    pub channel_capacity: usize,
    /// Largest accepted free-text message in bytes
    pub max_message_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_url_source: ConfigSource::Default,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            first_byte_timeout: Duration::from_secs(30),
            inter_chunk_timeout: Duration::from_secs(30),
            channel_capacity: 100,
            max_message_bytes: 100 * 1024, // 100KB
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay values from a parsed TOML file
    pub fn apply_toml(&mut self, file: &ClientToml) {
        if let Some(ref url) = file.server.base_url {
            self.base_url = url.clone();
            self.base_url_source = ConfigSource::File;
        }
        if let Some(ms) = file.server.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.server.request_timeout_ms {
            self.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.streaming.first_byte_timeout_ms {
            self.first_byte_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.streaming.inter_chunk_timeout_ms {
            self.inter_chunk_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = file.streaming.channel_capacity {
            self.channel_capacity = capacity;
        }
        if let Some(bytes) = file.input.max_message_bytes {
            self.max_message_bytes = bytes;
        }
    }

    /// Overlay values from environment variables
    ///
    /// `lookup` resolves a variable name; pass `std::env::var` in production.
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("COURSE_CHAT_BASE_URL") {
            self.base_url = url;
            self.base_url_source = ConfigSource::Env;
        }
        if let Some(ms) = parse_env::<u64>(&lookup, "COURSE_CHAT_FIRST_BYTE_TIMEOUT_MS") {
            self.first_byte_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_env::<u64>(&lookup, "COURSE_CHAT_INTER_CHUNK_TIMEOUT_MS") {
            self.inter_chunk_timeout = Duration::from_millis(ms);
        }
        if let Some(bytes) = parse_env::<usize>(&lookup, "COURSE_CHAT_MAX_MESSAGE_BYTES") {
            self.max_message_bytes = bytes;
        }
    }

    /// Overlay command-line values
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref url) = overrides.base_url {
            self.base_url = url.clone();
            self.base_url_source = ConfigSource::Cli;
        }
        if let Some(ms) = overrides.first_byte_timeout_ms {
            self.first_byte_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.inter_chunk_timeout_ms {
            self.inter_chunk_timeout = Duration::from_millis(ms);
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http:// or https:// (got {:?} from {})",
                self.base_url, self.base_url_source
            )));
        }
        if self.first_byte_timeout.is_zero() || self.inter_chunk_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "stream timeouts must be greater than zero".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Default configuration file path (`$XDG_CONFIG_HOME/course-chat/config.toml`)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("course-chat").join("config.toml"))
}

/// Load configuration from the default path, if the file exists
pub fn load_config(overrides: &ConfigOverrides) -> Result<ClientConfig, ConfigError> {
    let path = default_config_path().filter(|p| p.exists());
    resolve(path.as_deref(), overrides, |key| std::env::var(key).ok())
}

/// Load configuration from an explicit path
///
/// With `None` this behaves like [`load_config`]. An explicit path that cannot
/// be read is an error.
pub fn load_config_from_path(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ClientConfig, ConfigError> {
    match path {
        Some(path) => resolve(Some(path), overrides, |key| std::env::var(key).ok()),
        None => load_config(overrides),
    }
}

/// Layer defaults, file, environment and overrides, then validate
pub fn resolve<F>(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    env: F,
) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(path) = path {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ClientToml = toml::from_str(&raw)?;
        config.apply_toml(&file);
        tracing::debug!(path = ?path, "Loaded configuration file");
    }

    config.apply_env(env);
    config.apply_overrides(overrides);
    config.validate()?;

    tracing::debug!(
        base_url = %config.base_url,
        source = %config.base_url_source,
        "Resolved client configuration"
    );
    Ok(config)
}
