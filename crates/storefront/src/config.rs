//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_BASE_URL` - Public URL for the storefront (`https://` enables secure cookies)
//!
//! ## Optional
//! - `BAZAAR_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`,
//!   then `sqlite://bazaar.db`)
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 8000)
//! - `BAZAAR_MEDIA_DIR` - Where uploaded item images are written (default: media)
//! - `BAZAAR_STATIC_DIR` - Static assets directory (default: crates/storefront/static)
//! - `BAZAAR_MAX_UPLOAD_BYTES` - Per-image size limit (default: 5 MiB)
//! - `BAZAAR_LOG_JSON` - Emit JSON logs when `true` or `1`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://bazaar.db";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Directory uploaded images are stored under (served at `/media`)
    pub media_dir: PathBuf,
    /// Directory of static assets (served at `/static`)
    pub static_dir: PathBuf,
    /// Maximum size of a single uploaded image in bytes
    pub max_upload_bytes: usize,
    /// Emit logs as JSON instead of text
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = SecretString::from(
            env.optional("BAZAAR_DATABASE_URL")
                .or_else(|| env.optional("DATABASE_URL"))
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
        );
        let host = env.parsed("BAZAAR_HOST", "127.0.0.1")?;
        let port = env.parsed("BAZAAR_PORT", "8000")?;
        let base_url = env.required("BAZAAR_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BAZAAR_BASE_URL".to_owned(), e.to_string())
        })?;

        let media_dir = PathBuf::from(env.or_default("BAZAAR_MEDIA_DIR", "media"));
        let static_dir = PathBuf::from(env.or_default("BAZAAR_STATIC_DIR", "crates/storefront/static"));
        let max_upload_bytes = env.optional("BAZAAR_MAX_UPLOAD_BYTES").map_or(
            Ok(DEFAULT_MAX_UPLOAD_BYTES),
            |v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidEnvVar("BAZAAR_MAX_UPLOAD_BYTES".to_owned(), e.to_string())
                })
            },
        )?;
        let log_json = env
            .optional("BAZAAR_LOG_JSON")
            .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"));

        let sentry_dsn = env.optional("SENTRY_DSN").filter(|v| !v.is_empty());
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env.parsed("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = env.parsed("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            media_dir,
            static_dir,
            max_upload_bytes,
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_owned())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
    }
}
