//! Configuration surface consumed by the client at construction
//!
//! Caching is opt-in: staleness is a correctness risk for a generic data
//! layer, so enabling it (and picking the TTL) is an explicit caller
//! decision. Everything else defaults to values that behave sensibly
//! against a backend on the same network.

use std::env;
use std::time::Duration;

use crate::errors::{DocBridgeError, Result};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tuning knobs for one client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Serve reads from the in-memory cache. Off by default.
    pub enable_cache: bool,
    /// Time-to-live for cache entries.
    pub cache_ttl: Duration,
    /// Additional attempts after the first failed one.
    pub max_retries: u32,
    /// First backoff delay; doubles per retry.
    pub retry_base_delay: Duration,
    /// Per-request network timeout handed to the transport.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Defaults with environment overrides applied.
    ///
    /// Recognized variables: `DOCBRIDGE_ENABLE_CACHE` ("1"/"true"),
    /// `DOCBRIDGE_CACHE_TTL_SECS`, `DOCBRIDGE_MAX_RETRIES`,
    /// `DOCBRIDGE_RETRY_BASE_DELAY_MS`, `DOCBRIDGE_REQUEST_TIMEOUT_SECS`.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_cache: env::var("DOCBRIDGE_ENABLE_CACHE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.enable_cache),
            cache_ttl: env_secs("DOCBRIDGE_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            max_retries: env::var("DOCBRIDGE_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_base_delay: env::var("DOCBRIDGE_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            request_timeout: env_secs("DOCBRIDGE_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
        }
    }

    /// Enable caching with the given TTL (useful in tests).
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.enable_cache = true;
        self.cache_ttl = ttl;
        self
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok().and_then(|v| v.parse().ok()).map(Duration::from_secs)
}

/// Connection coordinates and API credential.
///
/// Token acquisition is out of scope here: the credential pair is assumed
/// already valid, supplied by the environment or explicit configuration.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Read credentials from `DOCBRIDGE_URL`, `DOCBRIDGE_API_KEY` and
    /// `DOCBRIDGE_API_SECRET`. A `.env` file is honored when present.
    ///
    /// Fails fast when the key or secret is missing rather than producing a
    /// client that 401s on every call.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let base_url =
            env::var("DOCBRIDGE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let api_key = env::var("DOCBRIDGE_API_KEY").map_err(|_| {
            DocBridgeError::Validation(
                "DOCBRIDGE_API_KEY is required but not set".to_string(),
            )
        })?;
        let api_secret = env::var("DOCBRIDGE_API_SECRET").map_err(|_| {
            DocBridgeError::Validation(
                "DOCBRIDGE_API_SECRET is required but not set".to_string(),
            )
        })?;

        Ok(Self { base_url, api_key, api_secret })
    }
}
