//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Key settings
//!
//! - `DATABASE_URL`: SQLite connection string (default: `sqlite:manga.db`)
//! - `RATE_LIMIT_ENABLED` / `RATE_LIMIT_RPS` / `RATE_LIMIT_BURST`: per-client
//!   throttle; disabling is intended for trusted/internal deployments
//! - `METRICS_PORT`: Prometheus listener (0 = disabled)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 4000)
    pub port: u16,

    /// Deployment environment name, reported by the healthcheck
    /// (default: "development")
    pub environment: String,

    // =========================================================================
    // Database Configuration
    // =========================================================================
    /// SQLite connection string (default: "sqlite:manga.db")
    pub database_url: String,

    /// Maximum pooled connections (default: 25)
    pub db_max_connections: u32,

    /// Per-operation deadline for store calls (default: 3 seconds).
    /// An overrun aborts the operation instead of hanging the request.
    pub db_query_timeout: Duration,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Global enable flag (default: true). Disabled = always admit.
    pub rate_limit_enabled: bool,

    /// Sustained requests per second per client (default: 2)
    pub rate_limit_rps: u32,

    /// Burst capacity per client above the sustained rate (default: 4)
    pub rate_limit_burst: u32,

    /// Interval for the background sweep that evicts idle rate-limiter
    /// buckets (default: 3 minutes)
    pub rate_limit_sweep_interval: Duration,

    // =========================================================================
    // Token Configuration
    // =========================================================================
    /// Lifetime of account-activation tokens (default: 3 days)
    pub activation_token_ttl: Duration,

    /// Lifetime of authentication tokens (default: 24 hours)
    pub authentication_token_ttl: Duration,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Maximum request body size in bytes (default: 1MB)
    pub max_request_body_size: usize,

    /// Comma-separated list of allowed CORS origins ("*" = any)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Port for the Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse or the
    /// combination is inconsistent.
    pub fn from_env() -> AppResult<Self> {
        // An absent .env file is fine
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 4000)?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:manga.db".to_string()),
            db_max_connections: Self::parse_env("DB_MAX_CONNECTIONS", 25)?,
            db_query_timeout: Duration::from_secs(Self::parse_env("DB_QUERY_TIMEOUT_SECS", 3)?),

            rate_limit_enabled: Self::parse_env("RATE_LIMIT_ENABLED", true)?,
            rate_limit_rps: Self::parse_env("RATE_LIMIT_RPS", 2)?,
            rate_limit_burst: Self::parse_env("RATE_LIMIT_BURST", 4)?,
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                180,
            )?),

            activation_token_ttl: Duration::from_secs(Self::parse_env(
                "ACTIVATION_TOKEN_TTL_SECS",
                3 * 24 * 60 * 60,
            )?),
            authentication_token_ttl: Duration::from_secs(Self::parse_env(
                "AUTHENTICATION_TOKEN_TTL_SECS",
                24 * 60 * 60,
            )?),

            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 1024 * 1024)?,
            cors_allowed_origins: Self::parse_cors_origins(),

            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_enabled && self.rate_limit_rps == 0 {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_RPS must be greater than 0 when rate limiting is enabled".to_string(),
            ));
        }

        if self.db_max_connections == 0 {
            return Err(AppError::ConfigError(
                "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
            ));
        }

        if self.db_query_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "DB_QUERY_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
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
        self.rate_limit_enabled && self.rate_limit_rps > 0
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, or `None` when disabled.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        let raw = env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string());
        raw.split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            environment: "development".to_string(),
            database_url: "sqlite:manga.db".to_string(),
            db_max_connections: 25,
            db_query_timeout: Duration::from_secs(3),
            rate_limit_enabled: true,
            rate_limit_rps: 2,
            rate_limit_burst: 4,
            rate_limit_sweep_interval: Duration::from_secs(180),
            activation_token_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            authentication_token_ttl: Duration::from_secs(24 * 60 * 60),
            max_request_body_size: 1024 * 1024,
            cors_allowed_origins: vec!["*".to_string()],
            metrics_port: 9090,
        }
    }
}
