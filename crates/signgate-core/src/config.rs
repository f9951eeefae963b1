//! Configuration management for SignGate.
//!
//! All configuration is driven by environment variables. A [`GatewayConfig`]
//! is built once at startup and passed by reference to each component's
//! constructor; nothing else in the workspace reads the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default name of the correlation header.
pub const DEFAULT_CORRELATION_HEADER: &str = "X-Request-Identifier";

/// Top-level gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Bind address for the listener.
    pub listen: String,
    /// Log level filter (overridden by `RUST_LOG`).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Correlation identifier settings.
    pub correlation: CorrelationConfig,
    /// Credential store settings.
    pub credentials: CredentialsConfig,
    /// Request signing settings.
    pub signing: SigningConfig,
    /// Upstream target.
    pub upstream: UpstreamConfig,
    /// Deadline covering body read, authentication, and forwarding.
    pub request_timeout_ms: u64,
    /// Upper bound on the body buffered for digest validation.
    pub max_body_bytes: usize,
    /// Path of the unauthenticated health endpoint. `None` disables it.
    pub health_path: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Correlation stage settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationConfig {
    /// Whether the correlation stage runs at all.
    pub enable: bool,
    /// Header carrying the correlation identifier.
    pub header: String,
}

/// Credential store settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    /// Path of the JSON credential document.
    pub path: PathBuf,
    /// What causes the store to re-read `path`.
    pub reload_trigger: ReloadTrigger,
}

/// Source of credential reload events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReloadTrigger {
    /// Reload on SIGHUP.
    Signal,
    /// Reload on a fixed interval.
    Interval {
        /// Seconds between reloads.
        seconds: u64,
    },
    /// Never reload after startup.
    Disabled,
}

impl FromStr for ReloadTrigger {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signal" | "sighup" => Ok(Self::Signal),
            "none" | "disabled" | "off" => Ok(Self::Disabled),
            other => match other.parse::<u64>() {
                Ok(0) | Err(_) => Err(ConfigError::invalid(
                    "CREDENTIALS_RELOAD",
                    format!("expected `signal`, `none`, or a positive number of seconds, got `{s}`"),
                )),
                Ok(seconds) => Ok(Self::Interval { seconds }),
            },
        }
    }
}

/// Signing protocol settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    /// HMAC algorithm name (`hmac-sha256` or `hmac-sha512`).
    pub algorithm: String,
    /// Scheme token expected at the start of the `Authorization` header.
    pub scheme: String,
    /// Symmetric clock skew tolerance in milliseconds.
    pub skew_millis: u64,
}

/// Upstream target settings.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamConfig {
    /// Upstream host name or IP.
    pub hostname: String,
    /// Upstream TCP port.
    pub port: u16,
    /// Timeout for a single forwarded exchange, in milliseconds.
    pub timeout_ms: u64,
}

impl UpstreamConfig {
    /// The `host:port` authority used for outbound requests.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// The forwarding timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            log_format: LogFormat::Text,
            correlation: CorrelationConfig {
                enable: true,
                header: DEFAULT_CORRELATION_HEADER.to_owned(),
            },
            credentials: CredentialsConfig {
                path: PathBuf::from("credentials.json"),
                reload_trigger: ReloadTrigger::Signal,
            },
            signing: SigningConfig {
                algorithm: "hmac-sha256".to_owned(),
                scheme: "HMAC".to_owned(),
                skew_millis: 300_000,
            },
            upstream: UpstreamConfig {
                hostname: "127.0.0.1".to_owned(),
                port: 3000,
                timeout_ms: 10_000,
            },
            request_timeout_ms: 30_000,
            max_body_bytes: 10 * 1024 * 1024,
            health_path: Some("/_gateway/health".to_owned()),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults. The result is validated before it is returned.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("LOG_FORMAT") {
            config.log_format = match v.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                _ => return Err(ConfigError::invalid("LOG_FORMAT", format!("unknown format `{v}`"))),
            };
        }
        if let Some(v) = lookup("CORRELATION_ENABLE") {
            config.correlation.enable = parse_bool("CORRELATION_ENABLE", &v)?;
        }
        if let Some(v) = lookup("CORRELATION_HEADER") {
            config.correlation.header = v;
        }
        if let Some(v) = lookup("CREDENTIALS_PATH") {
            config.credentials.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("CREDENTIALS_RELOAD") {
            config.credentials.reload_trigger = v.parse()?;
        }
        if let Some(v) = lookup("SIGNING_ALGORITHM") {
            config.signing.algorithm = v;
        }
        if let Some(v) = lookup("SIGNING_SCHEME") {
            config.signing.scheme = v;
        }
        if let Some(v) = lookup("SIGNING_SKEW_MILLIS") {
            config.signing.skew_millis = parse_number("SIGNING_SKEW_MILLIS", &v)?;
        }
        if let Some(v) = lookup("UPSTREAM_HOSTNAME") {
            config.upstream.hostname = v;
        }
        if let Some(v) = lookup("UPSTREAM_PORT") {
            config.upstream.port = parse_number("UPSTREAM_PORT", &v)?;
        }
        if let Some(v) = lookup("UPSTREAM_TIMEOUT_MS") {
            config.upstream.timeout_ms = parse_number("UPSTREAM_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = parse_number("REQUEST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("HEALTH_PATH") {
            config.health_path = Some(v).filter(|p| !p.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field invariants that the components rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if http::HeaderName::from_bytes(self.correlation.header.as_bytes()).is_err() {
            return Err(ConfigError::invalid(
                "CORRELATION_HEADER",
                format!("`{}` is not a valid header name", self.correlation.header),
            ));
        }
        if self.signing.scheme.trim().is_empty() || self.signing.scheme.contains(' ') {
            return Err(ConfigError::invalid(
                "SIGNING_SCHEME",
                "must be a single non-empty token",
            ));
        }
        if self.upstream.hostname.trim().is_empty() {
            return Err(ConfigError::invalid("UPSTREAM_HOSTNAME", "must not be empty"));
        }
        if self.upstream.port == 0 {
            return Err(ConfigError::invalid("UPSTREAM_PORT", "must not be 0"));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::invalid("UPSTREAM_TIMEOUT_MS", "must not be 0"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::invalid("REQUEST_TIMEOUT_MS", "must not be 0"));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid("MAX_BODY_BYTES", "must not be 0"));
        }
        if let Some(path) = &self.health_path {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid("HEALTH_PATH", "must start with `/`"));
            }
        }

        Ok(())
    }

    /// The parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen.parse().map_err(|_| {
            ConfigError::invalid("GATEWAY_LISTEN", format!("invalid bind address `{}`", self.listen))
        })
    }

    /// The per-request deadline as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, format!("expected a boolean, got `{value}`"))),
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("expected a number, got `{value}`")))
}
