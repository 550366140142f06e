//! Configuration module for airsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Passwords are never part of the configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::errors::{AirSyncError, AirSyncResult};
use crate::domain::identity::DeviceIdentity;
use crate::domain::version::ProtocolVersion;
use crate::query::QueryMode;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for airsync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub device: DeviceConfig,
    pub transport: TransportConfig,
    pub sync: SyncConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Where the server lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name, optionally with a port (`mail.example.com:8443`).
    pub host: String,
    /// `https` or `http`.
    pub scheme: String,
    /// Path of the sync endpoint.
    pub path: String,
    /// Path of the autodiscover endpoint.
    pub autodiscover_path: String,
}

/// Identity this client presents to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub user: String,
    /// Windows domain; sent as `DOMAIN\user` when set.
    pub domain: Option<String>,
    pub device_id: String,
    pub device_type: String,
    /// Windows LCID (1033 = en-US).
    pub locale: u16,
    pub accept_language: String,
    /// `12.0`, `12.1`, `14.0`, `14.1`, `16.0` or `16.1`.
    pub protocol_version: String,
    /// Policy key from a previous Provision exchange.
    pub policy_key: Option<String>,
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// `plain` or `base64`.
    pub query_mode: String,
    /// Send `MS-ASAcceptMultiPart: T` (plain query mode only).
    pub accept_multipart: bool,
    /// Accept gzip-compressed responses.
    pub gzip: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Replace inline photo payloads in decoded responses with their size.
    pub redact_photos: bool,
    pub user_agent: String,
}

/// Sync merge loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Ceiling on round trips for one sync call.
    pub max_rounds: u32,
    /// Pause between rounds in milliseconds.
    pub round_delay_ms: u64,
}

/// Polling helper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds.
    pub delay_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/airsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("airsync")
            .join("config.yaml")
    }

    /// Scheme, host and port of the server, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.server.scheme, self.server.host.trim_end_matches('/'))
    }

    pub fn protocol_version(&self) -> AirSyncResult<ProtocolVersion> {
        self.device.protocol_version.parse()
    }

    pub fn query_mode(&self) -> AirSyncResult<QueryMode> {
        self.transport.query_mode.parse()
    }

    pub fn device_identity(&self) -> AirSyncResult<DeviceIdentity> {
        if self.device.device_id.trim().is_empty() {
            return Err(AirSyncError::Configuration("device.device_id is empty".into()));
        }
        let mut identity = DeviceIdentity::new(
            self.device.user.clone(),
            self.device.device_id.clone(),
            self.device.device_type.clone(),
        )
        .with_locale(self.device.locale);
        identity.policy_key = self.device.policy_key.clone();
        Ok(identity)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transport.timeout_secs)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.sync.round_delay_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.polling.delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            scheme: "https".to_string(),
            path: "/Microsoft-Server-ActiveSync".to_string(),
            autodiscover_path: "/autodiscover/autodiscover.xml".to_string(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            domain: None,
            device_id: "airsync0000000001".to_string(),
            device_type: "airsync".to_string(),
            locale: 1033,
            accept_language: "en-us".to_string(),
            protocol_version: ProtocolVersion::default().as_str().to_string(),
            policy_key: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            query_mode: QueryMode::PlainText.as_str().to_string(),
            accept_multipart: false,
            gzip: true,
            timeout_secs: 100,
            redact_photos: true,
            user_agent: format!("airsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            round_delay_ms: 0,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.max_rounds"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `server.scheme`.
const VALID_SCHEMES: &[&str] = &["https", "http"];

/// Device id and type travel as length-prefixed fields of one byte.
const MAX_IDENTITY_FIELD_LEN: usize = 255;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- server ---
        if self.server.host.trim().is_empty() {
            push("server.host", "must not be empty".into());
        }
        if !VALID_SCHEMES.contains(&self.server.scheme.as_str()) {
            push(
                "server.scheme",
                format!(
                    "invalid scheme '{}'; valid options: {}",
                    self.server.scheme,
                    VALID_SCHEMES.join(", ")
                ),
            );
        }
        if !self.server.path.starts_with('/') {
            push("server.path", "must start with '/'".into());
        }
        if !self.server.autodiscover_path.starts_with('/') {
            push("server.autodiscover_path", "must start with '/'".into());
        }

        // --- device ---
        if self.device.user.trim().is_empty() {
            push("device.user", "must not be empty".into());
        }
        for (field, value) in [
            ("device.device_id", &self.device.device_id),
            ("device.device_type", &self.device.device_type),
        ] {
            if value.trim().is_empty() {
                push(field, "must not be empty".into());
            } else if value.len() > MAX_IDENTITY_FIELD_LEN {
                push(
                    field,
                    format!("must be at most {MAX_IDENTITY_FIELD_LEN} bytes"),
                );
            }
        }
        if let Err(e) = self.protocol_version() {
            push("device.protocol_version", e.to_string());
        }

        // --- transport ---
        if let Err(e) = self.query_mode() {
            push("transport.query_mode", e.to_string());
        }
        if self.transport.timeout_secs == 0 {
            push("transport.timeout_secs", "must be greater than 0".into());
        }

        // --- sync ---
        if self.sync.max_rounds == 0 {
            push("sync.max_rounds", "must be greater than 0".into());
        }

        // --- polling ---
        if self.polling.max_attempts == 0 {
            push("polling.max_attempts", "must be greater than 0".into());
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use airsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .server_host("mail.example.com")
///     .device_user("alice")
///     .transport_query_mode("base64")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- server ---

    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn server_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.server.scheme = scheme.into();
        self
    }

    pub fn server_path(mut self, path: impl Into<String>) -> Self {
        self.config.server.path = path.into();
        self
    }

    // --- device ---

    pub fn device_user(mut self, user: impl Into<String>) -> Self {
        self.config.device.user = user.into();
        self
    }

    pub fn device_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.device.domain = Some(domain.into());
        self
    }

    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.device.device_id = id.into();
        self
    }

    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.config.device.device_type = device_type.into();
        self
    }

    pub fn device_locale(mut self, lcid: u16) -> Self {
        self.config.device.locale = lcid;
        self
    }

    pub fn device_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.device.protocol_version = version.into();
        self
    }

    pub fn device_policy_key(mut self, key: impl Into<String>) -> Self {
        self.config.device.policy_key = Some(key.into());
        self
    }

    // --- transport ---

    pub fn transport_query_mode(mut self, mode: impl Into<String>) -> Self {
        self.config.transport.query_mode = mode.into();
        self
    }

    pub fn transport_accept_multipart(mut self, enabled: bool) -> Self {
        self.config.transport.accept_multipart = enabled;
        self
    }

    pub fn transport_gzip(mut self, enabled: bool) -> Self {
        self.config.transport.gzip = enabled;
        self
    }

    pub fn transport_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.transport.timeout_secs = seconds;
        self
    }

    pub fn transport_redact_photos(mut self, enabled: bool) -> Self {
        self.config.transport.redact_photos = enabled;
        self
    }

    // --- sync ---

    pub fn sync_max_rounds(mut self, rounds: u32) -> Self {
        self.config.sync.max_rounds = rounds;
        self
    }

    pub fn sync_round_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.round_delay_ms = ms;
        self
    }

    // --- polling ---

    pub fn polling_max_attempts(mut self, attempts: u32) -> Self {
        self.config.polling.max_attempts = attempts;
        self
    }

    pub fn polling_delay_ms(mut self, ms: u64) -> Self {
        self.config.polling.delay_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
