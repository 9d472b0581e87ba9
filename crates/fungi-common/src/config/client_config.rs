//! Client configuration structs
//!
//! Loads configuration from environment variables or builds it in code.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Smallest accepted keep-alive latency, in seconds
pub const KEEP_ALIVE_LATENCY_MIN: u64 = 5;

/// Largest accepted keep-alive latency, in seconds
pub const KEEP_ALIVE_LATENCY_MAX: u64 = 30;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// WebSocket endpoint of the Fungi server
    pub ws_endpoint: String,

    /// Auth endpoint settings, required for private channels
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Seconds subtracted from the server's activity timeout to get the
    /// ping interval. Pings are only sent when this is set.
    #[serde(default)]
    pub keep_alive_latency: Option<u64>,

    /// Defer connecting until the client runs in a browser-like target
    #[serde(default)]
    pub client_only: bool,

    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
}

/// Auth endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub endpoint: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default = "default_auth_timeout_ms")]
    pub timeout_ms: u64,
}

// Default value functions
fn default_connection_timeout_ms() -> u64 {
    10_000
}

fn default_auth_timeout_ms() -> u64 {
    10_000
}

impl AuthConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: Vec::new(),
            timeout_ms: default_auth_timeout_ms(),
        }
    }

    /// Add a header sent with every auth request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ClientConfig {
    /// Create a configuration for the given WebSocket endpoint with defaults
    #[must_use]
    pub fn new(ws_endpoint: impl Into<String>) -> Self {
        Self {
            ws_endpoint: ws_endpoint.into(),
            auth: None,
            keep_alive_latency: None,
            client_only: false,
            connection_timeout_ms: default_connection_timeout_ms(),
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_keep_alive_latency(mut self, seconds: u64) -> Self {
        self.keep_alive_latency = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_client_only(mut self, client_only: bool) -> Self {
        self.client_only = client_only;
        self
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Auth endpoint URL, if one is configured
    #[must_use]
    pub fn auth_endpoint(&self) -> Option<&str> {
        self.auth
            .as_ref()
            .map(|auth| auth.endpoint.as_str())
            .filter(|endpoint| !endpoint.is_empty())
    }

    /// Check the configuration for values the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(latency) = self.keep_alive_latency {
            if !(KEEP_ALIVE_LATENCY_MIN..=KEEP_ALIVE_LATENCY_MAX).contains(&latency) {
                return Err(ConfigError::KeepAliveLatencyOutOfRange(latency));
            }
        }

        if self.ws_endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "FUNGI_WS_ENDPOINT",
                "endpoint must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or
    /// a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ws_endpoint =
            lookup("FUNGI_WS_ENDPOINT").ok_or(ConfigError::MissingVar("FUNGI_WS_ENDPOINT"))?;

        let auth = match lookup("FUNGI_AUTH_ENDPOINT") {
            Some(endpoint) => Some(AuthConfig {
                endpoint,
                headers: lookup("FUNGI_AUTH_HEADERS")
                    .map(|raw| parse_headers(&raw))
                    .transpose()?
                    .unwrap_or_default(),
                timeout_ms: parse_var(&lookup, "FUNGI_AUTH_TIMEOUT_MS")?
                    .unwrap_or_else(default_auth_timeout_ms),
            }),
            None => None,
        };

        let config = Self {
            ws_endpoint,
            auth,
            keep_alive_latency: parse_var(&lookup, "FUNGI_KEEP_ALIVE_LATENCY")?,
            client_only: parse_var(&lookup, "FUNGI_CLIENT_ONLY")?.unwrap_or(false),
            connection_timeout_ms: parse_var(&lookup, "FUNGI_CONNECTION_TIMEOUT_MS")?
                .unwrap_or_else(default_connection_timeout_ms),
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

/// Parse `Name: value` pairs separated by `;`
fn parse_headers(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidValue("FUNGI_AUTH_HEADERS", pair.to_string()))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error(
        "The keep alive latency must be between 5 and 30 (inclusive). You provided a value of {0}."
    )]
    KeepAliveLatencyOutOfRange(u64),
}
