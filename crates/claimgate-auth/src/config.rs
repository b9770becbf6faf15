//! Authorizer configuration.
//!
//! The only value that must be supplied is the identity pool id; everything
//! else has a default. The trusted issuer and the JWKS discovery URL are both
//! derived from the provider URL and the pool id.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default provider base URL (the region-scoped Cognito identity endpoint).
pub const DEFAULT_PROVIDER_URL: &str = "https://cognito-idp.us-west-1.amazonaws.com";

/// Path of the key discovery document, relative to the issuer.
pub const JWKS_PATH: &str = ".well-known/jwks.json";

/// Root configuration for the token authorizer.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// pool_id = "us-west-1_AbCdEf123"
///
/// [auth.jwks]
/// request_timeout = "5s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    /// Identity pool id. Required; the issuer is `{provider_url}/{pool_id}`.
    pub pool_id: String,

    /// Base URL of the identity provider (scheme and host).
    pub provider_url: String,

    /// Key discovery settings.
    pub jwks: JwksConfig,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            pool_id: String::new(),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            jwks: JwksConfig::default(),
        }
    }
}

/// Key discovery (JWKS) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwksConfig {
    /// HTTP timeout for the discovery request. Expiry surfaces as a key
    /// fetch error.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response size in bytes.
    pub max_response_size: usize,

    /// Allow plain HTTP discovery URLs. Only meant for local testing.
    pub allow_http: bool,

    /// Age after which the cached key set is fetched again.
    /// `None` keeps the first successfully fetched key set for the lifetime
    /// of the process.
    #[serde(default, with = "humantime_serde")]
    pub refresh_ttl: Option<Duration>,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024, // 1 MB
            allow_http: false,
            refresh_ttl: None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The HTTP client for key discovery could not be created.
    #[error("HTTP client could not be created: {0}")]
    HttpClient(String),
}

impl AuthorizerConfig {
    /// Creates a configuration for the given pool with default settings.
    #[must_use]
    pub fn new(pool_id: impl Into<String>) -> Self {
        Self {
            pool_id: pool_id.into(),
            ..Self::default()
        }
    }

    /// Sets the provider base URL.
    #[must_use]
    pub fn with_provider_url(mut self, provider_url: impl Into<String>) -> Self {
        self.provider_url = provider_url.into();
        self
    }

    /// Replaces the key discovery settings.
    #[must_use]
    pub fn with_jwks(mut self, jwks: JwksConfig) -> Self {
        self.jwks = jwks;
        self
    }

    /// The trusted issuer, compared verbatim with the `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!(
            "{}/{}",
            self.provider_url.trim_end_matches('/'),
            self.pool_id.trim_matches('/')
        )
    }

    /// URL of the issuer's key discovery document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the derived URL does not parse.
    pub fn jwks_uri(&self) -> Result<Url, ConfigError> {
        let raw = format!("{}/{}", self.issuer(), JWKS_PATH);
        Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidValue(format!("jwks uri '{raw}': {e}")))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the pool id is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The provider URL does not parse or uses a scheme other than HTTPS
    ///   (HTTP is accepted only with `jwks.allow_http`)
    /// - The request timeout or response size limit is zero
    /// - The refresh TTL is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_id.trim().is_empty() {
            return Err(ConfigError::Missing("pool_id".to_string()));
        }

        let provider = Url::parse(&self.provider_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "provider_url '{}' is not a valid URL: {}",
                self.provider_url, e
            ))
        })?;

        match provider.scheme() {
            "https" => {}
            "http" if self.jwks.allow_http => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "provider_url scheme '{}' is not allowed. Must be https",
                    other
                )));
            }
        }

        if self.jwks.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "jwks.request_timeout must be > 0".to_string(),
            ));
        }

        if self.jwks.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "jwks.max_response_size must be > 0".to_string(),
            ));
        }

        if self.jwks.refresh_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(ConfigError::InvalidValue(
                "jwks.refresh_ttl must be > 0 when set".to_string(),
            ));
        }

        self.jwks_uri().map(|_| ())
    }
}
