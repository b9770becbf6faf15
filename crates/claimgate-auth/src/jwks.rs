//! Signing key resolution for the trusted issuer.
//!
//! [`KeyResolver`] fetches the issuer's JSON Web Key Set once and keeps the
//! resulting [`KeySet`] for every later invocation. The cache is read-through:
//!
//! - A cold cache triggers a fetch of `{issuer}/.well-known/jwks.json`.
//! - A warm cache is returned as-is. A `kid` missing from a warm cache is
//!   unknown; it does not cause a re-fetch.
//! - A failed fetch leaves the cache cold, so the next call tries again.
//!
//! Without a configured `refresh_ttl` the key set is never refreshed, which
//! means keys rotated by the provider are not picked up until the process
//! restarts or [`KeyResolver::invalidate`] is called.
//!
//! # Concurrency
//!
//! The lock is never held across the network fetch. Concurrent callers on a
//! cold cache may each fetch; the last completed fetch wins. Key material for
//! a given `kid` is stable, so any winner is equivalent.
//!
//! # Security Considerations
//!
//! - Only HTTPS discovery URLs are allowed (configurable for testing)
//! - The request timeout bounds how long a hung provider can stall a caller
//! - Response size is limited
//! - Encryption keys (`use: "enc"`) are never used for signature checks

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use url::Url;

use crate::config::JwksConfig;

/// Verification keys indexed by key id.
pub type KeySet = HashMap<String, SigningKey>;

/// Errors that can occur while fetching the issuer's key set.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    ClientError(String),

    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The request did not complete within the configured timeout.
    #[error("JWKS request timed out")]
    Timeout,

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed as JSON.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// No usable signing keys were found in the JWKS.
    #[error("No signing keys found in JWKS")]
    NoSigningKeys,

    /// A published key could not be converted to a decoding key.
    #[error("Invalid key {kid}: {message}")]
    InvalidKey {
        /// Key id of the offending key.
        kid: String,
        /// Conversion error.
        message: String,
    },

    /// The JWKS URI scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: only HTTPS is allowed")]
    InvalidScheme,

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

impl JwksError {
    /// Returns `true` if the provider could not be reached or answered with
    /// an error status, as opposed to returning an unusable key set.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::Timeout | Self::HttpError(_) | Self::ResponseTooLarge { .. }
        )
    }
}

impl From<reqwest::Error> for JwksError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

/// A verification key published by the identity provider.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    algorithm: Option<Algorithm>,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Converts a published JWK into verification-ready key material.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::InvalidKey` if the JWK has no `kid` or its
    /// parameters cannot be turned into a decoding key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, JwksError> {
        let key_id = jwk.common.key_id.clone().ok_or_else(|| JwksError::InvalidKey {
            kid: String::new(),
            message: "missing kid".to_string(),
        })?;

        let decoding_key = DecodingKey::from_jwk(jwk).map_err(|e| JwksError::InvalidKey {
            kid: key_id.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            algorithm: jwk_algorithm(jwk),
            key_id,
            decoding_key,
        })
    }

    /// The key id (`kid`) this key is published under.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The algorithm declared by the JWK, if any.
    #[must_use]
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Key material for signature verification.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Cached key set with its fetch time.
struct CachedKeys {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Read-through cache of the trusted issuer's signing keys.
pub struct KeyResolver {
    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
    /// Discovery endpoint of the trusted issuer.
    jwks_uri: Url,
    /// `None` until the first successful fetch.
    cache: RwLock<Option<CachedKeys>>,
    config: JwksConfig,
}

impl KeyResolver {
    /// Creates a resolver for the given discovery endpoint. Nothing is
    /// fetched until the first [`resolve_keys`](Self::resolve_keys).
    ///
    /// # Errors
    ///
    /// Returns `JwksError::ClientError` if the HTTP client cannot be built.
    pub fn new(jwks_uri: Url, config: JwksConfig) -> Result<Self, JwksError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::ClientError(e.to_string()))?;

        Ok(Self {
            http_client,
            jwks_uri,
            cache: RwLock::new(None),
            config,
        })
    }

    /// The discovery endpoint this resolver fetches from.
    #[must_use]
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// Returns the cached key set, fetching it first if the cache is cold
    /// (or older than `refresh_ttl`, when one is configured).
    ///
    /// # Errors
    ///
    /// Returns an error if a fetch was needed and failed. The cache is left
    /// untouched in that case.
    pub async fn resolve_keys(&self) -> Result<Arc<KeySet>, JwksError> {
        if let Some(keys) = self.cached_keys().await {
            tracing::trace!(jwks_uri = %self.jwks_uri, "JWKS cache hit");
            return Ok(keys);
        }

        tracing::debug!(jwks_uri = %self.jwks_uri, "JWKS cache cold, fetching");
        let keys = match self.fetch().await {
            Ok(keys) => Arc::new(keys),
            Err(e) if e.is_transport_error() => {
                tracing::warn!(jwks_uri = %self.jwks_uri, error = %e, "JWKS endpoint unavailable");
                return Err(e);
            }
            Err(e) => {
                tracing::error!(jwks_uri = %self.jwks_uri, error = %e, "JWKS response unusable");
                return Err(e);
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    /// Looks up a single key by `kid`, resolving the key set if needed.
    ///
    /// Returns `Ok(None)` when the key set does not contain `kid`. No
    /// additional fetch is made in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set could not be resolved.
    pub async fn get_key(&self, kid: &str) -> Result<Option<SigningKey>, JwksError> {
        let keys = self.resolve_keys().await?;
        Ok(keys.get(kid).cloned())
    }

    async fn cached_keys(&self) -> Option<Arc<KeySet>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref()?;

        if let Some(ttl) = self.config.refresh_ttl
            && cached.fetched_at.elapsed() >= ttl
        {
            return None;
        }

        Some(Arc::clone(&cached.keys))
    }

    /// Fetches and converts the key set without touching the cache.
    async fn fetch(&self) -> Result<KeySet, JwksError> {
        self.validate_scheme(&self.jwks_uri)?;

        let mut response = self
            .http_client
            .get(self.jwks_uri.as_str())
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(JwksError::HttpError(response.status().as_u16()));
        }

        let max_size = self.config.max_response_size;
        if let Some(len) = response.content_length()
            && len as usize > max_size
        {
            return Err(JwksError::ResponseTooLarge { max_size });
        }

        // Content-Length may be absent (chunked encoding); enforce the cap
        // while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max_size {
                return Err(JwksError::ResponseTooLarge { max_size });
            }
            body.extend_from_slice(&chunk);
        }

        let jwks: JwkSet =
            serde_json::from_slice(&body).map_err(|e| JwksError::ParseError(e.to_string()))?;

        let keys = build_key_set(&jwks)?;
        tracing::debug!(jwks_uri = %self.jwks_uri, keys = keys.len(), "Fetched JWKS");
        Ok(keys)
    }

    /// Validates that the URI uses an allowed scheme.
    fn validate_scheme(&self, uri: &Url) -> Result<(), JwksError> {
        match uri.scheme() {
            "https" => Ok(()),
            "http" if self.config.allow_http => Ok(()),
            _ => Err(JwksError::InvalidScheme),
        }
    }

    /// Drops the cached key set. The next resolve fetches again.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        tracing::debug!(jwks_uri = %self.jwks_uri, "Invalidated JWKS cache");
    }

    /// Returns `true` once a key set has been fetched and cached.
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }
}

/// Converts a published key set into a [`KeySet`].
///
/// Encryption keys and keys without a `kid` are skipped. A signing key whose
/// parameters cannot be converted fails the whole set.
fn build_key_set(jwks: &JwkSet) -> Result<KeySet, JwksError> {
    let mut keys = KeySet::with_capacity(jwks.keys.len());

    for jwk in &jwks.keys {
        if matches!(&jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
            continue;
        }
        if jwk.common.key_id.is_none() {
            tracing::debug!("Skipping JWK without kid");
            continue;
        }

        let key = SigningKey::from_jwk(jwk)?;
        keys.insert(key.key_id.clone(), key);
    }

    if keys.is_empty() {
        return Err(JwksError::NoSigningKeys);
    }

    Ok(keys)
}

/// Extracts the algorithm from a JWK.
fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}
