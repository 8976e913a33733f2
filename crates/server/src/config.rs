//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! Every setting has a local-development default; nothing is required.
//!
//! - `SCOUT_DATABASE_URL` - `PostgreSQL` connection string (fallback:
//!   `DATABASE_URL`). Without one, documents and sessions live in memory.
//! - `SCOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `SCOUT_PORT` - Listen port (default: 3000)
//! - `SCOUT_BASE_URL` - Public URL (default: <http://localhost:3000>);
//!   `https://` enables secure cookies
//! - `SCOUT_STATIC_DIR` - Directory holding the client's `index.html`
//!   (default: crates/server/static)
//! - `SCOUT_PROTECTED_PATHS` - Comma-separated page paths that require sign-in
//!   in addition to the built-in protected pages
//! - `ACCOUNT_DELETE_MAX_ATTEMPTS` - Attempts for account data deletion on
//!   transient backend failures (default: 3, minimum 1)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for human-readable
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Directory with the client shell (`index.html`)
    pub static_dir: PathBuf,
    /// Extra page paths that require sign-in
    pub protected_paths: Vec<String>,
    /// Attempts for account data deletion
    pub delete_max_attempts: u32,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Error event sample rate
    pub sentry_sample_rate: f32,
    /// Transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            static_dir: PathBuf::from("crates/server/static"),
            protected_paths: Vec::new(),
            delete_max_attempts: 3,
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let host = parse_env("SCOUT_HOST", defaults.host)?;
        let port = parse_env("SCOUT_PORT", defaults.port)?;
        let base_url = get_optional_env("SCOUT_BASE_URL").unwrap_or(defaults.base_url);
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SCOUT_BASE_URL".to_owned(), e.to_string())
        })?;

        let static_dir = get_optional_env("SCOUT_STATIC_DIR")
            .map_or(defaults.static_dir, PathBuf::from);
        let protected_paths = get_optional_env("SCOUT_PROTECTED_PATHS")
            .map(|raw| parse_path_list(&raw))
            .unwrap_or_default();
        let delete_max_attempts: u32 =
            parse_env("ACCOUNT_DELETE_MAX_ATTEMPTS", defaults.delete_max_attempts)?;
        if delete_max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ACCOUNT_DELETE_MAX_ATTEMPTS".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            database_url: get_database_url("SCOUT_DATABASE_URL"),
            host,
            port,
            base_url,
            static_dir,
            protected_paths,
            delete_max_attempts,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", defaults.sentry_sample_rate)?,
            sentry_traces_sample_rate: parse_env(
                "SENTRY_TRACES_SAMPLE_RATE",
                defaults.sentry_traces_sample_rate,
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
    })
}

/// Split a comma-separated path list, normalizing each entry to start with `/`.
fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                p.to_owned()
            } else {
                format!("/{p}")
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_list() {
        assert_eq!(
            parse_path_list(" /account, settings ,,/rate/new"),
            vec!["/account", "/settings", "/rate/new"]
        );
        assert!(parse_path_list("").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.delete_max_attempts, 3);
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let port: u16 = parse_env("SCOUT_TEST_SURELY_UNSET_PORT", 4000).unwrap();
        assert_eq!(port, 4000);
    }
}
