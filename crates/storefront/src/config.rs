//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `SHOPFRONT_API_URL` - Remote service base URL (default: `http://localhost:5000/api`)
//! - `SHOPFRONT_HTTP_TIMEOUT_SECS` - Request timeout, at most 3600 (default: transport default)
//! - `SHOPFRONT_CACHE_TTL_SECS` - Read-through cache TTL, at most 604800 (default: 300)
//! - `SHOPFRONT_CACHE_CAPACITY` - Read-through cache capacity (default: 1000)
//! - `SHOPFRONT_MAX_SYNC_ATTEMPTS` - Failed syncs before a line is rolled back (default: 3)
//! - `SHOPFRONT_NOTICE_SECS` - Lifetime of user-facing notices, at most 3600 (default: 3)
//! - `SHOPFRONT_CURRENCY` - Currency catalog prices are quoted in (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::str::FromStr;
use std::time::Duration;

use shopfront_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;
const DEFAULT_MAX_SYNC_ATTEMPTS: u32 = 3;
const DEFAULT_NOTICE_SECS: u64 = 3;

const MAX_TIMEOUT_SECS: u64 = 3600;
const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;
const MAX_NOTICE_SECS: u64 = 3600;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Remote service configuration
    pub api: ApiConfig,
    /// Cart synchronization settings
    pub sync: SyncConfig,
    /// How long notices and the "last added" indicator stay visible
    pub notice_ttl: Duration,
    /// Currency catalog prices are quoted in
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Remote REST service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Per-request timeout, `None` for the transport default
    pub timeout: Option<Duration>,
    /// Read-through cache time-to-live
    pub cache_ttl: Duration,
    /// Read-through cache capacity (entries)
    pub cache_capacity: u64,
}

/// Cart synchronization settings.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Failed sync attempts after which a pending line is rolled back
    pub max_attempts: u32,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            sync: SyncConfig::default(),
            notice_ttl: Duration::from_secs(DEFAULT_NOTICE_SECS),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_SYNC_ATTEMPTS,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let notice_ttl = secs_env_or("SHOPFRONT_NOTICE_SECS", DEFAULT_NOTICE_SECS, MAX_NOTICE_SECS)?;
        let currency = parse_env_or("SHOPFRONT_CURRENCY", CurrencyCode::default())?;

        Ok(Self {
            api: ApiConfig::from_env()?,
            sync: SyncConfig::from_env()?,
            notice_ttl,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = match get_optional_env("SHOPFRONT_API_URL") {
            Some(raw) => parse_base_url(&raw).map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPFRONT_API_URL".to_string(), e)
            })?,
            None => default_api_url(),
        };

        let timeout = get_optional_env("SHOPFRONT_HTTP_TIMEOUT_SECS")
            .map(|raw| parse_secs("SHOPFRONT_HTTP_TIMEOUT_SECS", &raw, MAX_TIMEOUT_SECS))
            .transpose()?;

        let cache_ttl = secs_env_or(
            "SHOPFRONT_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
            MAX_CACHE_TTL_SECS,
        )?;
        let cache_capacity = parse_env_or("SHOPFRONT_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;

        Ok(Self {
            base_url,
            timeout,
            cache_ttl,
            cache_capacity,
        })
    }
}

impl SyncConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = parse_env_or("SHOPFRONT_MAX_SYNC_ATTEMPTS", DEFAULT_MAX_SYNC_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_MAX_SYNC_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_attempts })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a duration in whole seconds, rejecting values above `max`.
fn parse_secs(key: &str, raw: &str, max: u64) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs > max {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("{secs} exceeds the maximum of {max} seconds"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse a bounded duration variable, falling back to `default` seconds.
fn secs_env_or(key: &str, default: u64, max: u64) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(Duration::from_secs(default)), |raw| {
        parse_secs(key, &raw, max)
    })
}

/// Parse a base URL and make sure relative joins keep its path.
///
/// `Url::join` replaces the last path segment unless the base ends with `/`.
///
/// # Errors
///
/// Returns a description of the problem if `raw` is not an absolute
/// `http`/`https` URL.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_api_url() -> Url {
    // The constant is a valid absolute http URL.
    parse_base_url(DEFAULT_API_URL).expect("default API URL is valid")
}
