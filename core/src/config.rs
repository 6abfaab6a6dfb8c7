//! Harness configuration.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. Built-in defaults ([`HarnessConfig::default`])
//! 2. A YAML file (`config.yaml`, or the path named by `HARNESS_CONFIG`)
//! 3. Environment variables `HARNESS_<SECTION>__<KEY>`, optionally from a `.env` file
//!
//! The result is validated once and then passed by reference to every
//! collaborator; nothing reads configuration from global state.
//!
//! # Example
//!
//! ```yaml
//! webserver:
//!   base_url: http://webserver:8080
//!   timeout_secs: 10
//! auth_service:
//!   base_url: http://auth:8081
//!   secret_key: test-secret
//! rabbitmq:
//!   host: rabbitmq
//!   notes_queue: notes
//! ```
//!
//! ```bash
//! HARNESS_WEBSERVER__BASE_URL=http://localhost:18080 cargo test -- --ignored
//! ```

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Prefix of environment variables read by [`HarnessConfig::load`].
pub const ENV_PREFIX: &str = "HARNESS";

/// Environment variable naming an alternative YAML file.
pub const CONFIG_PATH_VAR: &str = "HARNESS_CONFIG";

/// YAML file read when `HARNESS_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or the merged settings could not be deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The `.env` file exists but could not be parsed
    #[error("Failed to read .env file: {0}")]
    DotEnv(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Connection settings for one external HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL, e.g. `http://localhost:8080`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// API version segment (`v0` gives `/api/v0/...`); empty for unversioned paths
    pub api_version: String,
    /// Optional API key sent as a default bearer credential
    pub api_key: Option<String>,
    /// Optional HS256 signing secret for token fixtures
    pub secret_key: Option<String>,
    /// Transport-level retries for throttled or failing responses
    pub max_retries: usize,
    /// Base backoff between retries in milliseconds (doubles each retry)
    pub retry_backoff_ms: u64,
}

impl ServiceConfig {
    /// Create a service configuration for `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Default settings of the auth service.
    #[must_use]
    pub fn auth_service_default() -> Self {
        Self::new("http://localhost:8081")
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the signing secret.
    #[must_use]
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the retry schedule.
    #[must_use]
    pub const fn with_retries(mut self, max_retries: usize, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry schedule for transport-level retries.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.retry_backoff_ms))
            .multiplier(2.0)
            .build()
    }

    /// Path of an endpoint under the configured API version.
    ///
    /// ```
    /// use notes_harness_core::config::ServiceConfig;
    ///
    /// let config = ServiceConfig::default();
    /// assert_eq!(config.versioned_path("/health"), "/api/v0/health");
    /// ```
    #[must_use]
    pub fn versioned_path(&self, suffix: &str) -> String {
        if self.api_version.is_empty() {
            suffix.to_string()
        } else {
            format!("/api/{}{suffix}", self.api_version)
        }
    }

    /// Absolute URL of `path` on this service.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Validate service configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "{name}.base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "{name}.timeout_secs must be > 0"
            )));
        }
        if !self
            .api_version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            return Err(ConfigError::Validation(format!(
                "{name}.api_version contains invalid characters: '{}'",
                self.api_version
            )));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            api_version: "v0".to_string(),
            api_key: None,
            secret_key: None,
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}

/// Connection settings for the RabbitMQ broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker host
    pub host: String,
    /// AMQP port
    pub port: u16,
    /// Login
    pub username: String,
    /// Password
    pub password: String,
    /// Virtual host
    pub virtual_host: String,
    /// Heartbeat interval negotiated with the broker, seconds
    pub heartbeat_secs: u16,
    /// Timeout of a single connection attempt, seconds
    pub connection_timeout_secs: u64,
    /// Number of connection attempts before giving up
    pub connection_attempts: usize,
    /// Delay between connection attempts, seconds
    pub retry_delay_secs: u64,
    /// Queue the webserver publishes created notes to
    pub notes_queue: String,
    /// Exchange in front of the notes queue, checked when set
    pub notes_exchange: Option<String>,
}

impl BrokerConfig {
    /// Schedule for connection attempts.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.connection_attempts.saturating_sub(1),
            Duration::from_secs(self.retry_delay_secs),
        )
    }

    /// Get connection timeout as Duration
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Validate broker configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Validation("rabbitmq.host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Validation("rabbitmq.port must be > 0".to_string()));
        }
        if self.connection_attempts == 0 {
            return Err(ConfigError::Validation(
                "rabbitmq.connection_attempts must be > 0".to_string(),
            ));
        }
        if self.notes_queue.is_empty() {
            return Err(ConfigError::Validation(
                "rabbitmq.notes_queue cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            virtual_host: "/".to_string(),
            heartbeat_secs: 60,
            connection_timeout_secs: 10,
            connection_attempts: 3,
            retry_delay_secs: 1,
            notes_queue: "notes".to_string(),
            notes_exchange: None,
        }
    }
}

/// Tunables of the scenario checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Allowed difference between a message's `created` time and "now", seconds
    pub clock_skew_tolerance_secs: u64,
}

impl ScenarioConfig {
    /// Get the tolerance as Duration
    #[must_use]
    pub const fn clock_skew_tolerance(&self) -> Duration {
        Duration::from_secs(self.clock_skew_tolerance_secs)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            clock_skew_tolerance_secs: 2,
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Webserver (note creation API)
    #[serde(default)]
    pub webserver: ServiceConfig,
    /// Auth service (note filtering)
    #[serde(default = "ServiceConfig::auth_service_default")]
    pub auth_service: ServiceConfig,
    /// Broker the webserver publishes to
    #[serde(default)]
    pub rabbitmq: BrokerConfig,
    /// Scenario tunables
    #[serde(default)]
    pub scenarios: ScenarioConfig,
    /// Fallback log level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl HarnessConfig {
    /// Load configuration from `.env`, the YAML file and the environment.
    ///
    /// The YAML file is `HARNESS_CONFIG` if set (and must then exist),
    /// otherwise `config.yaml` in the working directory if present.
    ///
    /// # Errors
    ///
    /// Returns error if a source cannot be parsed or the result is invalid
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::DotEnv(e.to_string())),
        }

        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_sources(Path::new(&path), true),
            Err(_) => Self::from_sources(Path::new(DEFAULT_CONFIG_FILE), false),
        }
    }

    /// Load configuration from an explicit YAML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or invalid, or the result is invalid
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_sources(path.as_ref(), true)
    }

    fn from_sources(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::from(PathBuf::from(path)).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(
            file = %path.display(),
            webserver = %config.webserver.base_url,
            auth_service = %config.auth_service.base_url,
            rabbitmq_host = %config.rabbitmq.host,
            rabbitmq_port = config.rabbitmq.port,
            notes_queue = %config.rabbitmq.notes_queue,
            "Harness configuration loaded"
        );

        Ok(config)
    }

    /// Validate entire configuration
    ///
    /// # Errors
    ///
    /// Returns error if any configuration section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.webserver.validate("webserver")?;
        self.auth_service.validate("auth_service")?;
        self.rabbitmq.validate()?;
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "invalid log_level: {}. Must be one of: {}",
                self.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            webserver: ServiceConfig::default(),
            auth_service: ServiceConfig::auth_service_default(),
            rabbitmq: BrokerConfig::default(),
            scenarios: ScenarioConfig::default(),
            log_level: default_log_level(),
        }
    }
}
