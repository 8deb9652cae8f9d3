//! Gateway configuration with validation.
//!
//! Loaded from an optional TOML file, then overridden from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bootstrap_core::{ConfigurationError, SharedSecret, DEFAULT_MAX_OUTSTANDING, DEFAULT_NONCE_TTL};
use serde::{Deserialize, Serialize};

/// Environment variables consulted by [`GatewayConfig::apply_env_overrides`].
pub mod env {
    pub const CONFIG: &str = "BOOTSTRAP_CONFIG";
    pub const SHARED_SECRET: &str = "BOOTSTRAP_SHARED_SECRET";
    pub const HTTP_HOST: &str = "BOOTSTRAP_HTTP_HOST";
    pub const HTTP_PORT: &str = "BOOTSTRAP_HTTP_PORT";
    pub const NONCE_TTL_SECS: &str = "BOOTSTRAP_NONCE_TTL_SECS";
    pub const SERVER_NAME: &str = "BOOTSTRAP_SERVER_NAME";
    pub const REGISTRATION_ENABLED: &str = "BOOTSTRAP_REGISTRATION_ENABLED";
}

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener
    pub http: HttpConfig,
    /// Bootstrap registration protocol
    pub registration: RegistrationConfig,
    /// Per-IP rate limiting
    pub rate_limit: RateLimitConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Request timeouts
    pub timeouts: TimeoutConfig,
}

impl GatewayConfig {
    /// Read `path` (or start from defaults), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `BOOTSTRAP_*` overrides using `lookup` as the variable source.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(env::SHARED_SECRET) {
            self.registration.shared_secret = Some(secret);
        }
        if let Some(host) = lookup(env::HTTP_HOST) {
            self.http.host = parse_env(env::HTTP_HOST, &host)?;
        }
        if let Some(port) = lookup(env::HTTP_PORT) {
            self.http.port = parse_env(env::HTTP_PORT, &port)?;
        }
        if let Some(ttl) = lookup(env::NONCE_TTL_SECS) {
            self.registration.nonce_ttl = Duration::from_secs(parse_env(env::NONCE_TTL_SECS, &ttl)?);
        }
        if let Some(name) = lookup(env::SERVER_NAME) {
            self.registration.server_name = name;
        }
        if let Some(enabled) = lookup(env::REGISTRATION_ENABLED) {
            self.registration.enabled = parse_bool(env::REGISTRATION_ENABLED, &enabled)?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Rate limits
        if self.rate_limit.nonce_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "nonce_per_minute cannot be 0".into(),
            ));
        }
        if self.rate_limit.register_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "register_per_minute cannot be 0".into(),
            ));
        }
        if self.rate_limit.burst_size == Some(0) {
            return Err(ConfigError::InvalidRateLimit("burst_size cannot be 0".into()));
        }

        // Limits
        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        // Timeouts
        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        self.registration.validate()
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
        }),
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8008, 0 picks an ephemeral port)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8008,
        }
    }
}

/// Bootstrap registration configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Both endpoints answer 403 when false
    pub enabled: bool,
    /// HMAC key; never written back out
    #[serde(skip_serializing)]
    pub shared_secret: Option<String>,
    /// Lifetime of an issued nonce
    #[serde(with = "humantime_serde")]
    pub nonce_ttl: Duration,
    /// Tracked nonces before a forced sweep
    pub max_outstanding_nonces: usize,
    /// Period of the background nonce sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Status code of the generic denial (4xx)
    pub denial_status: u16,
    /// Domain part of created user IDs
    pub server_name: String,
    /// `expires_in` of issued access tokens
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            shared_secret: None,
            nonce_ttl: DEFAULT_NONCE_TTL,
            max_outstanding_nonces: DEFAULT_MAX_OUTSTANDING,
            sweep_interval: Duration::from_secs(30),
            denial_status: 403,
            server_name: "localhost".to_string(),
            token_lifetime: Duration::from_secs(3600),
        }
    }
}

impl RegistrationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.nonce_ttl.is_zero() {
            return Err(ConfigurationError::ZeroTtl.into());
        }
        if self.max_outstanding_nonces == 0 {
            return Err(ConfigError::InvalidRegistration(
                "max_outstanding_nonces cannot be 0".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidRegistration(
                "sweep_interval cannot be 0".into(),
            ));
        }
        if !(400..=499).contains(&self.denial_status) {
            return Err(ConfigError::InvalidRegistration(format!(
                "denial_status must be a 4xx code, got {}",
                self.denial_status
            )));
        }
        if self.server_name.trim().is_empty() {
            return Err(ConfigError::InvalidRegistration(
                "server_name cannot be empty".into(),
            ));
        }
        if self.enabled {
            self.shared_secret()?;
        }
        Ok(())
    }

    /// The configured secret, or `MissingSharedSecret` when unset or empty.
    pub fn shared_secret(&self) -> Result<SharedSecret, ConfigurationError> {
        SharedSecret::from_config(self.shared_secret.as_deref())
    }
}

impl std::fmt::Debug for RegistrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationConfig")
            .field("enabled", &self.enabled)
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("nonce_ttl", &self.nonce_ttl)
            .field("max_outstanding_nonces", &self.max_outstanding_nonces)
            .field("sweep_interval", &self.sweep_interval)
            .field("denial_status", &self.denial_status)
            .field("server_name", &self.server_name)
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Nonce requests per minute per IP
    pub nonce_per_minute: u32,
    /// Registration submissions per minute per IP
    pub register_per_minute: u32,
    /// Burst allowance; defaults to the per-minute rate
    pub burst_size: Option<u32>,
    /// IPs exempt from rate limiting
    pub whitelist: Vec<IpAddr>,
    /// Key buckets on `X-Forwarded-For` / `X-Real-IP` instead of the peer address
    pub trust_forwarded_for: bool,
    /// Idle time after which a bucket is dropped
    #[serde(with = "humantime_serde")]
    pub bucket_idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            nonce_per_minute: 3,
            register_per_minute: 2,
            burst_size: None,
            whitelist: vec![
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            ],
            trust_forwarded_for: false,
            bucket_idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 64KiB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 64 * 1024,
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on handling one request
    #[serde(with = "humantime_serde")]
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Invalid registration section
    #[error("invalid registration config: {0}")]
    InvalidRegistration(String),
    /// Missing secret or zero TTL
    #[error(transparent)]
    Registration(#[from] ConfigurationError),
    /// Config file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Config file is not valid TOML for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment override did not parse
    #[error("invalid value for {var}: {value:?}")]
    Env { var: &'static str, value: String },
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be tried before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            scaled(mins, 60, "invalid minutes")
        } else if let Some(hours) = s.strip_suffix('h') {
            scaled(hours, 3600, "invalid hours")
        } else {
            // Plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }

    /// `value * unit_secs`, rejecting overflow.
    fn scaled(value: &str, unit_secs: u64, err: &'static str) -> Result<Duration, &'static str> {
        value
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(unit_secs))
            .map(Duration::from_secs)
            .ok_or(err)
    }
}
