//! services/mirror/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    /// When set, passthrough requests go to this backend instead of the local trick store.
    pub upstream_url: Option<String>,
    pub tricks_file: PathBuf,
    pub static_dir: Option<PathBuf>,
    /// Directory for the durable storage scope. Kept in memory when unset.
    pub state_dir: Option<PathBuf>,
    pub owner_email: String,
    pub owner_password: String,
    pub session_lifetime: chrono::Duration,
    pub stream_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            log_level: Level::INFO,
            upstream_url: None,
            tricks_file: PathBuf::from("./api/tricks"),
            static_dir: None,
            state_dir: None,
            owner_email: "owner@example.com".to_string(),
            owner_password: "change-me".to_string(),
            session_lifetime: chrono::Duration::days(30),
            stream_delay: Duration::from_millis(30),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Server ---
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
            })?,
            Err(_) => defaults.bind_address,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Backends ---
        let upstream_url = std::env::var("UPSTREAM_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        if let Some(url) = &upstream_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(
                    "UPSTREAM_URL".to_string(),
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }

        let tricks_file = std::env::var("TRICKS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.tricks_file);
        let static_dir = std::env::var("STATIC_DIR").ok().map(PathBuf::from);
        let state_dir = std::env::var("STATE_DIR").ok().map(PathBuf::from);

        // --- Owner account ---
        let owner_email = std::env::var("OWNER_EMAIL").unwrap_or(defaults.owner_email);
        if owner_email.trim().is_empty() {
            return Err(ConfigError::MissingVar("OWNER_EMAIL".to_string()));
        }
        let owner_password = std::env::var("OWNER_PASSWORD").unwrap_or(defaults.owner_password);

        // --- Simulation knobs ---
        let session_lifetime = match std::env::var("SESSION_LIFETIME_DAYS") {
            Ok(raw) => {
                let days = parse_positive("SESSION_LIFETIME_DAYS", &raw)?;
                chrono::Duration::days(days as i64)
            }
            Err(_) => defaults.session_lifetime,
        };
        let stream_delay = match std::env::var("STREAM_DELAY_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue("STREAM_DELAY_MS".to_string(), e.to_string()))?,
            ),
            Err(_) => defaults.stream_delay,
        };

        Ok(Self {
            bind_address,
            log_level,
            upstream_url,
            tricks_file,
            static_dir,
            state_dir,
            owner_email,
            owner_password,
            session_lifetime,
            stream_delay,
        })
    }
}

fn parse_positive(var: &str, raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(ConfigError::InvalidValue(var.to_string(), "must be positive".to_string())),
        Err(e) => Err(ConfigError::InvalidValue(var.to_string(), e.to_string())),
    }
}
