//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//! Values are read once at startup and are read-only afterwards.
//!
//! # Host Policy
//!
//! - `ALLOWED_INSECURE_HOSTS`: Comma-separated Host allow-list (empty disables validation)
//! - `CANONICAL_HOST`: Hostname all traffic is redirected to
//! - `BASE_URL`: Scheme and port used when building canonical URLs
//! - `HTTPS_REDIRECT`: Redirect plaintext requests to HTTPS and stamp HSTS
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_MAX_ATTEMPTS`: Attempts per window per client (default: 0 = disabled)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length in seconds (default: 60)

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::environment::Environment;
use crate::error::{AppError, AppResult};
use crate::middleware::host::strip_port;

/// Base URL used when `BASE_URL` is unset and the port is the default.
const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default request body collection limit (16 KiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024;

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8080)
    pub port: u16,

    /// Deployment environment (default: development)
    pub environment: Environment,

    // =========================================================================
    // Host Policy Configuration
    // =========================================================================
    /// Hostnames (without port) accepted in the `Host` header.
    /// Empty disables host validation.
    pub allowed_insecure_hosts: Vec<String>,

    /// Authoritative hostname; requests for any other host are redirected.
    pub canonical_host: Option<String>,

    /// Public base URL of the site (scheme and port of canonical redirects)
    pub base_url: Url,

    /// Redirect plaintext requests to HTTPS and stamp HSTS on secure responses
    pub https_redirect: bool,

    /// Comma-separated list of allowed CORS origins.
    /// Empty disables CORS handling; "*" allows any origin.
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Request Handling Configuration
    // =========================================================================
    /// Directory served by the static asset stage (default: "Public")
    pub public_directory: PathBuf,

    /// Maximum request body size buffered before routing (default: 16 KiB)
    pub max_body_size: usize,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Attempts allowed per client per window (0 = disabled)
    pub rate_limit_max_attempts: u32,

    /// Length of the rate limiting window
    pub rate_limit_window: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level filter (e.g., "info", "debug", "request_pipeline=trace")
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,

    /// Classify image/script/style responses as static and log them at debug.
    /// When disabled every response is logged as dynamic.
    pub static_classification: bool,

    /// Port for Prometheus metrics endpoint (0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if any configuration value is invalid
    /// (e.g., non-numeric PORT value, unparseable BASE_URL).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let port: u16 = Self::parse_env("PORT", 8080)?;
        let base_url = match env::var("BASE_URL") {
            Ok(raw) => Url::parse(raw.trim())
                .map_err(|e| AppError::Config(format!("Invalid BASE_URL: {e}")))?,
            Err(_) => Self::default_base_url(port)?,
        };

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            environment: Self::parse_env("APP_ENV", Environment::Development)?,

            // Host policy
            allowed_insecure_hosts: Self::parse_list("ALLOWED_INSECURE_HOSTS"),
            canonical_host: env::var("CANONICAL_HOST")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            base_url,
            https_redirect: Self::parse_bool_env("HTTPS_REDIRECT", false)?,
            cors_allowed_origins: Self::parse_list("CORS_ALLOWED_ORIGINS"),

            // Request handling
            public_directory: env::var("PUBLIC_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("Public")),
            max_body_size: Self::parse_env("MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE)?,

            // Rate limiting
            rate_limit_max_attempts: Self::parse_env("RATE_LIMIT_MAX_ATTEMPTS", 0)?,
            rate_limit_window: Duration::from_secs(Self::parse_env("RATE_LIMIT_WINDOW_SECS", 60)?),

            // Observability
            log_level: env::var("LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            static_classification: Self::parse_bool_env("STATIC_CLASSIFICATION", true)?,
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_body_size == 0 {
            return Err(AppError::Config(
                "MAX_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.rate_limiting_enabled() && self.rate_limit_window.is_zero() {
            return Err(AppError::Config(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0 when rate limiting is enabled"
                    .to_string(),
            ));
        }

        if self.canonical_host.is_some() && self.base_url.host_str().is_none() {
            return Err(AppError::Config(format!(
                "BASE_URL ({}) must have a host when CANONICAL_HOST is set",
                self.base_url
            )));
        }

        if self
            .allowed_insecure_hosts
            .iter()
            .any(|h| strip_port(h) != h.as_str())
        {
            return Err(AppError::Config(
                "ALLOWED_INSECURE_HOSTS entries must not include a port".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if rate limiting is enabled.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_max_attempts > 0
    }

    /// Check if host validation is enabled.
    pub fn host_validation_enabled(&self) -> bool {
        !self.allowed_insecure_hosts.is_empty()
    }

    /// Check if CORS handling is enabled.
    pub fn cors_enabled(&self) -> bool {
        !self.cors_allowed_origins.is_empty()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    fn default_base_url(port: u16) -> AppResult<Url> {
        Url::parse(&format!("http://localhost:{port}"))
            .map_err(|e| AppError::Config(format!("Invalid default BASE_URL: {e}")))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_env(name: &str, default: bool) -> AppResult<bool> {
        match env::var(name) {
            Ok(val) => parse_bool(&val)
                .ok_or_else(|| AppError::Config(format!("Invalid {name}: expected a boolean"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated list from an environment variable.
    fn parse_list(name: &str) -> Vec<String> {
        env::var(name)
            .map(|raw| split_list(&raw))
            .unwrap_or_default()
    }
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            // Host policy
            allowed_insecure_hosts: vec![],
            canonical_host: None,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL literal is valid"),
            https_redirect: false,
            cors_allowed_origins: vec![],
            // Request handling
            public_directory: PathBuf::from("Public"),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            // Rate limiting
            rate_limit_max_attempts: 0,
            rate_limit_window: Duration::from_secs(60),
            // Observability
            log_level: "info".to_string(),
            log_json: false,
            static_classification: true,
            metrics_port: 0,
        }
    }
}
