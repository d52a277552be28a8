//! TOML Configuration File Support
//!
//! Centralized configuration loading for the kiosk, from a TOML file at
//! `~/.config/queue-kiosk/kiosk.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (see [`ConfigOverrides`])
//! 2. Environment variables (`KIOSK_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://127.0.0.1:8000"
//! kiosk_id = "arena-1"
//! api_key = "secret"
//! request_timeout_ms = 10000
//!
//! [queue]
//! capacity = 6
//! poll_interval_ms = 5000
//! status_poll_interval_ms = 10000
//! malformed_payload = "skip"
//!
//! [push]
//! enabled = true
//! reconnect_delay_ms = 1000
//! max_reconnect_delay_ms = 30000
//!
//! [scanner]
//! agent_enabled = true
//! agent_url = "ws://127.0.0.1:8765"
//! quiet_period_ms = 250
//!
//! [display]
//! arrival_duration_ms = 1200
//! splash_duration_ms = 2200
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::ReconnectPolicy;

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

/// What to do with a queue payload that cannot be parsed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPayloadPolicy {
    /// Treat as a fetch failure and keep the current display
    #[default]
    Skip,
    /// Fail closed: apply an empty queue
    TreatAsEmpty,
    /// Treat as a fetch failure and show an error notice
    Surface,
}

impl MalformedPayloadPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "treat_as_empty" | "empty" => Some(Self::TreatAsEmpty),
            "surface" | "banner" => Some(Self::Surface),
            _ => None,
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Base URL of the kiosk backend
    pub base_url: Option<String>,
    /// Identity of this kiosk
    pub kiosk_id: Option<String>,
    /// Kiosk API key sent as `X-API-Key`
    pub api_key: Option<String>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
}

/// Queue section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueToml {
    /// Number of visible slots
    pub capacity: Option<usize>,
    /// Queue poll interval in milliseconds
    pub poll_interval_ms: Option<u64>,
    /// Status poll interval in milliseconds
    pub status_poll_interval_ms: Option<u64>,
    /// Handling of unparseable queue payloads
    pub malformed_payload: Option<MalformedPayloadPolicy>,
}

/// Push channel section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushToml {
    /// Whether to listen for push notifications
    pub enabled: Option<bool>,
    /// Initial reconnect delay in milliseconds
    pub reconnect_delay_ms: Option<u64>,
    /// Reconnect delay ceiling in milliseconds
    pub max_reconnect_delay_ms: Option<u64>,
}

/// Scanner section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerToml {
    /// Whether to connect to the local scanning agent
    pub agent_enabled: Option<bool>,
    /// Local scanning agent websocket URL
    pub agent_url: Option<String>,
    /// Keyboard-wedge quiet period in milliseconds
    pub quiet_period_ms: Option<u64>,
}

/// Display section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Arrival animation duration in milliseconds
    pub arrival_duration_ms: Option<u64>,
    /// Splash banner duration in milliseconds
    pub splash_duration_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskToml {
    /// Backend configuration section
    pub backend: BackendToml,
    /// Queue configuration section
    pub queue: QueueToml,
    /// Push channel configuration section
    pub push: PushToml,
    /// Scanner configuration section
    pub scanner: ScannerToml,
    /// Display configuration section
    pub display: DisplayToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Backend connection settings
#[derive(Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the kiosk backend
    pub base_url: String,
    /// Identity of this kiosk
    pub kiosk_id: String,
    /// Kiosk API key
    pub api_key: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            kiosk_id: "kiosk-1".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Queue reconciliation settings
#[derive(Clone, Debug)]
pub struct QueueSettings {
    /// Number of visible slots
    pub capacity: usize,
    /// Queue poll interval
    pub poll_interval: Duration,
    /// Status poll interval
    pub status_poll_interval: Duration,
    /// Handling of unparseable queue payloads
    pub malformed_payload: MalformedPayloadPolicy,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 6,
            poll_interval: Duration::from_secs(5),
            status_poll_interval: Duration::from_secs(10),
            malformed_payload: MalformedPayloadPolicy::Skip,
        }
    }
}

/// Push channel settings
#[derive(Clone, Debug)]
pub struct PushSettings {
    /// Whether to listen for push notifications
    pub enabled: bool,
    /// Reconnect backoff
    pub reconnect: ReconnectPolicy,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Scanner settings
#[derive(Clone, Debug)]
pub struct ScannerSettings {
    /// Whether to connect to the local scanning agent
    pub agent_enabled: bool,
    /// Local scanning agent websocket URL
    pub agent_url: String,
    /// Keyboard-wedge quiet period
    pub quiet_period: Duration,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            agent_enabled: true,
            agent_url: "ws://127.0.0.1:8765".to_string(),
            quiet_period: Duration::from_millis(250),
        }
    }
}

/// Presentation timing
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    /// Arrival animation duration
    pub arrival_duration: Duration,
    /// Splash banner duration
    pub splash_duration: Duration,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            arrival_duration: Duration::from_millis(1200),
            splash_duration: Duration::from_millis(2200),
        }
    }
}

/// Centralized configuration for the kiosk
///
/// Use [`load_config`] to load with proper priority handling, then
/// [`ConfigOverrides::apply`] for CLI flags.
#[derive(Clone, Debug)]
pub struct KioskConfig {
    /// Backend connection
    pub backend: BackendSettings,
    /// Queue reconciliation
    pub queue: QueueSettings,
    /// Push channel
    pub push: PushSettings,
    /// Scanner
    pub scanner: ScannerSettings,
    /// Presentation timing
    pub display: DisplaySettings,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    /// Source of configuration values
    source: ConfigSource,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            queue: QueueSettings::default(),
            push: PushSettings::default(),
            scanner: ScannerSettings::default(),
            display: DisplaySettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl KioskConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the kiosk unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "queue.capacity must be at least 1".to_string(),
            ));
        }
        if self.backend.kiosk_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.kiosk_id must not be empty".to_string(),
            ));
        }
        if self.queue.poll_interval.is_zero() || self.queue.status_poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll intervals must be greater than zero".to_string(),
            ));
        }
        let reconnect = self.push.reconnect;
        if reconnect.initial_delay.is_zero() {
            return Err(ConfigError::ValidationError(
                "push.reconnect_delay_ms must be greater than zero".to_string(),
            ));
        }
        if reconnect.max_delay < reconnect.initial_delay {
            return Err(ConfigError::ValidationError(format!(
                "push.max_reconnect_delay_ms ({}) is below push.reconnect_delay_ms ({})",
                reconnect.max_delay.as_millis(),
                reconnect.initial_delay.as_millis()
            )));
        }
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must be http(s): {}",
                self.backend.base_url
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/queue-kiosk/kiosk.toml` or
/// `~/.config/queue-kiosk/kiosk.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("queue-kiosk").join("kiosk.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<KioskConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<KioskConfig, ConfigError> {
    let mut config = KioskConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: KioskToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut KioskConfig, toml: &KioskToml) {
    if let Some(ref url) = toml.backend.base_url {
        config.backend.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(ref id) = toml.backend.kiosk_id {
        config.backend.kiosk_id = id.clone();
    }
    if toml.backend.api_key.is_some() {
        config.backend.api_key = toml.backend.api_key.clone();
    }
    if let Some(ms) = toml.backend.request_timeout_ms {
        config.backend.request_timeout = Duration::from_millis(ms);
    }

    if let Some(capacity) = toml.queue.capacity {
        config.queue.capacity = capacity;
    }
    if let Some(ms) = toml.queue.poll_interval_ms {
        config.queue.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.queue.status_poll_interval_ms {
        config.queue.status_poll_interval = Duration::from_millis(ms);
    }
    if let Some(policy) = toml.queue.malformed_payload {
        config.queue.malformed_payload = policy;
    }

    if let Some(enabled) = toml.push.enabled {
        config.push.enabled = enabled;
    }
    if let Some(ms) = toml.push.reconnect_delay_ms {
        config.push.reconnect.initial_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.push.max_reconnect_delay_ms {
        config.push.reconnect.max_delay = Duration::from_millis(ms);
    }

    if let Some(enabled) = toml.scanner.agent_enabled {
        config.scanner.agent_enabled = enabled;
    }
    if let Some(ref url) = toml.scanner.agent_url {
        config.scanner.agent_url = url.clone();
    }
    if let Some(ms) = toml.scanner.quiet_period_ms {
        config.scanner.quiet_period = Duration::from_millis(ms);
    }

    if let Some(ms) = toml.display.arrival_duration_ms {
        config.display.arrival_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.display.splash_duration_ms {
        config.display.splash_duration = Duration::from_millis(ms);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut KioskConfig) {
    if let Ok(url) = std::env::var("KIOSK_SERVER") {
        config.backend.base_url = url.trim_end_matches('/').to_string();
        config.source = ConfigSource::Env;
    }
    if let Ok(id) = std::env::var("KIOSK_ID") {
        config.backend.kiosk_id = id;
        config.source = ConfigSource::Env;
    }
    if let Ok(key) = std::env::var("KIOSK_API_KEY") {
        config.backend.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Ok(capacity) = std::env::var("KIOSK_CAPACITY") {
        if let Ok(n) = capacity.parse::<usize>() {
            config.queue.capacity = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(interval) = std::env::var("KIOSK_POLL_INTERVAL_MS") {
        if let Ok(ms) = interval.parse::<u64>() {
            config.queue.poll_interval = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(policy) = std::env::var("KIOSK_MALFORMED_PAYLOAD") {
        if let Some(policy) = MalformedPayloadPolicy::parse(&policy) {
            config.queue.malformed_payload = policy;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(enabled) = std::env::var("KIOSK_PUSH") {
        config.push.enabled = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Ok(url) = std::env::var("KIOSK_AGENT_URL") {
        config.scanner.agent_url = url;
        config.source = ConfigSource::Env;
    }
    if let Ok(enabled) = std::env::var("KIOSK_AGENT") {
        config.scanner.agent_enabled = enabled != "0" && enabled.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL override
    pub base_url: Option<String>,
    /// Kiosk id override
    pub kiosk_id: Option<String>,
    /// API key override
    pub api_key: Option<String>,
    /// Capacity override
    pub capacity: Option<usize>,
    /// Push channel enabled override
    pub push_enabled: Option<bool>,
    /// Scanning agent enabled override
    pub agent_enabled: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set kiosk id override
    #[must_use]
    pub fn with_kiosk_id(mut self, id: impl Into<String>) -> Self {
        self.kiosk_id = Some(id.into());
        self
    }

    /// Set API key override
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set capacity override
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set push channel enabled override
    #[must_use]
    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.push_enabled = Some(enabled);
        self
    }

    /// Set scanning agent enabled override
    #[must_use]
    pub fn with_agent_enabled(mut self, enabled: bool) -> Self {
        self.agent_enabled = Some(enabled);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.kiosk_id.is_none()
            && self.api_key.is_none()
            && self.capacity.is_none()
            && self.push_enabled.is_none()
            && self.agent_enabled.is_none()
    }

    /// Apply overrides to a loaded configuration
    pub fn apply(&self, config: &mut KioskConfig) {
        if self.is_empty() {
            return;
        }
        if let Some(ref url) = self.base_url {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref id) = self.kiosk_id {
            config.backend.kiosk_id = id.clone();
        }
        if self.api_key.is_some() {
            config.backend.api_key = self.api_key.clone();
        }
        if let Some(capacity) = self.capacity {
            config.queue.capacity = capacity;
        }
        if let Some(enabled) = self.push_enabled {
            config.push.enabled = enabled;
        }
        if let Some(enabled) = self.agent_enabled {
            config.scanner.agent_enabled = enabled;
        }
        config.source = ConfigSource::Cli;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.queue.capacity, 6);
        assert_eq!(config.scanner.quiet_period, Duration::from_millis(250));
        assert_eq!(config.queue.malformed_payload, MalformedPayloadPolicy::Skip);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://kiosk.example/"
kiosk_id = "arena-2"

[queue]
capacity = 4
malformed_payload = "treat_as_empty"

[push]
reconnect_delay_ms = 250
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.backend.base_url, "https://kiosk.example");
        assert_eq!(config.backend.kiosk_id, "arena-2");
        assert_eq!(config.queue.capacity, 4);
        assert_eq!(
            config.queue.malformed_payload,
            MalformedPayloadPolicy::TreatAsEmpty
        );
        assert_eq!(
            config.push.reconnect.initial_delay,
            Duration::from_millis(250)
        );
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/queue-kiosk.toml"))).unwrap();
        assert!(config.config_file_path.is_none());
        assert_eq!(config.queue.capacity, 6);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[queue\ncapacity = ").unwrap();
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = KioskConfig::default();
        config.queue.capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_reconnect_delay() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[push]\nreconnect_delay_ms = 0").unwrap();
        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert!(config.push.reconnect.initial_delay.is_zero());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("reconnect_delay_ms")
        ));
    }

    #[test]
    fn test_validation_rejects_max_delay_below_initial() {
        let mut config = KioskConfig::default();
        config.push.reconnect.initial_delay = Duration::from_secs(5);
        config.push.reconnect.max_delay = Duration::from_secs(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("max_reconnect_delay_ms")
        ));

        config.push.reconnect.max_delay = Duration::from_secs(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_blank_kiosk_id() {
        let mut config = KioskConfig::default();
        config.backend.kiosk_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = KioskConfig::default();
        ConfigOverrides::new()
            .with_kiosk_id("lobby")
            .with_capacity(8)
            .with_push_enabled(false)
            .apply(&mut config);

        assert_eq!(config.backend.kiosk_id, "lobby");
        assert_eq!(config.queue.capacity, 8);
        assert!(!config.push.enabled);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = KioskConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_malformed_policy_parse() {
        assert_eq!(
            MalformedPayloadPolicy::parse("Surface"),
            Some(MalformedPayloadPolicy::Surface)
        );
        assert_eq!(MalformedPayloadPolicy::parse("crash"), None);
    }
}
