//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;

/// Output format of the fmt tracing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// One accepted API key, stored as the hex SHA-256 of the raw key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyHash {
    pub name: String,
    pub hash: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub database_acquire_timeout_secs: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub log_format: LogFormat,

    /// Accepted API keys (`API_KEYS=name:sha256hex,other:sha256hex`)
    pub api_keys: Vec<ApiKeyHash>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let database_acquire_timeout_secs = var_or("DATABASE_ACQUIRE_TIMEOUT_SECS", "5")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_ACQUIRE_TIMEOUT_SECS"))?;

        let run_migrations = parse_bool(&var_or("RUN_MIGRATIONS", "false"))
            .ok_or(ConfigError::InvalidValue("RUN_MIGRATIONS"))?;

        let host = var_or("HOST", "127.0.0.1");

        let port = var_or("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = var_or("ENVIRONMENT", "development");

        let log_format = match var_or("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        let api_keys = parse_api_keys(&var_or("API_KEYS", ""))?;

        let config = Self {
            database_url,
            database_max_connections,
            database_acquire_timeout_secs,
            run_migrations,
            host,
            port,
            environment,
            log_format,
            api_keys,
        };

        // An empty key ring rejects every /api/v1 request
        if config.is_production() && config.api_keys.is_empty() {
            return Err(ConfigError::MissingEnv("API_KEYS"));
        }

        Ok(config)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_api_keys(value: &str) -> Result<Vec<ApiKeyHash>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, hash) = entry
                .split_once(':')
                .ok_or(ConfigError::InvalidValue("API_KEYS"))?;
            let hash = hash.trim().to_ascii_lowercase();
            if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidValue("API_KEYS"));
            }
            Ok(ApiKeyHash {
                name: name.trim().to_string(),
                hash,
            })
        })
        .collect()
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
