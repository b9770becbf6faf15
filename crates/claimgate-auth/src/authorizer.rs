//! The request-time token authorizer.
//!
//! [`TokenAuthorizer`] runs the full pipeline for one invocation:
//!
//! 1. Structural check and header decode ([`parse_header`])
//! 2. Key lookup by `kid` ([`KeyResolver`], fetching the key set if cold)
//! 3. Signature and claim checks ([`ClaimVerifier`])
//! 4. Decision for the requested resource ([`generate_decision`])
//!
//! Every failure, including an unreachable key endpoint, ends in a `Deny`
//! decision. Nothing is surfaced to the gateway as an error.

use serde::{Deserialize, Serialize};

use crate::config::{AuthorizerConfig, ConfigError};
use crate::error::{Rejection, RejectionReason};
use crate::jwks::{JwksError, KeyResolver};
use crate::policy::{AuthorizationDecision, PLACEHOLDER_PRINCIPAL_ID, generate_decision};
use crate::token::{ClaimVerifier, TokenClaims, parse_header};

/// One inbound invocation from the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    /// Bearer token as received. May be absent.
    #[serde(default)]
    pub authorization_token: Option<String>,

    /// Identifier of the resource being invoked.
    #[serde(default)]
    pub method_arn: String,
}

impl AuthorizeRequest {
    /// Creates a request for `resource` carrying `token`.
    #[must_use]
    pub fn new(token: Option<impl Into<String>>, resource: impl Into<String>) -> Self {
        Self {
            authorization_token: token.map(Into::into),
            method_arn: resource.into(),
        }
    }
}

/// Result of one invocation: the decision plus how it was reached.
#[derive(Debug)]
pub struct AuthorizationOutcome {
    /// The decision to return to the gateway.
    pub decision: AuthorizationDecision,
    /// Verified claims, or why the token was rejected.
    pub verification: Result<TokenClaims, Rejection>,
}

impl AuthorizationOutcome {
    /// The rejection reason, if the token was rejected.
    #[must_use]
    pub fn reason(&self) -> Option<RejectionReason> {
        self.verification.as_ref().err().map(Rejection::reason)
    }

    /// The verified claims, if verification succeeded.
    #[must_use]
    pub fn claims(&self) -> Option<&TokenClaims> {
        self.verification.as_ref().ok()
    }
}

/// Bearer token authorizer for a single trusted issuer.
///
/// Shareable across tasks; the only mutable state is the key cache inside
/// the [`KeyResolver`].
pub struct TokenAuthorizer {
    resolver: KeyResolver,
    verifier: ClaimVerifier,
}

impl TokenAuthorizer {
    /// Builds an authorizer from configuration. No network call is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (for example, the
    /// pool id is missing) or the HTTP client cannot be created.
    pub fn from_config(config: &AuthorizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver =
            KeyResolver::new(config.jwks_uri()?, config.jwks.clone()).map_err(|e| match e {
                JwksError::ClientError(message) => ConfigError::HttpClient(message),
                other => ConfigError::InvalidValue(other.to_string()),
            })?;

        tracing::debug!(
            issuer = %config.issuer(),
            jwks_uri = %resolver.jwks_uri(),
            "Token authorizer configured"
        );

        Ok(Self::with_parts(resolver, ClaimVerifier::new(config.issuer())))
    }

    /// Assembles an authorizer from an existing resolver and verifier.
    #[must_use]
    pub fn with_parts(resolver: KeyResolver, verifier: ClaimVerifier) -> Self {
        Self { resolver, verifier }
    }

    /// The key resolver and its cache.
    #[must_use]
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// The claim verifier.
    #[must_use]
    pub fn verifier(&self) -> &ClaimVerifier {
        &self.verifier
    }

    /// Verifies a bearer token, stopping at the first failing check.
    ///
    /// A leading `Bearer ` scheme is stripped before parsing.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] of the first failing check.
    pub async fn verify(&self, token: Option<&str>) -> Result<TokenClaims, Rejection> {
        let token = token.map(strip_bearer);
        let header = parse_header(token)?;

        let key = self
            .resolver
            .get_key(&header.kid)
            .await?
            .ok_or_else(|| Rejection::unknown_key(&header.kid))?;

        self.verifier.verify(token.unwrap_or_default(), &key)
    }

    /// Decides one invocation.
    pub async fn authorize(&self, request: &AuthorizeRequest) -> AuthorizationOutcome {
        tracing::debug!(
            resource = %request.method_arn,
            has_token = request.authorization_token.is_some(),
            "Authorizer invoked"
        );

        let verification = self.verify(request.authorization_token.as_deref()).await;

        match &verification {
            Ok(claims) => tracing::info!(
                subject = %claims.subject,
                username = claims.username.as_deref().unwrap_or(""),
                client_id = %claims.client_id,
                "Claim confirmed"
            ),
            Err(rejection) if rejection.is_token_error() => tracing::info!(
                reason = %rejection.reason(),
                error = %rejection,
                "Token rejected"
            ),
            Err(rejection) => tracing::warn!(
                reason = %rejection.reason(),
                error = %rejection,
                "Signing keys unavailable, denying"
            ),
        }

        // The principal is the fixed placeholder even when claims verified.
        let decision = generate_decision(
            PLACEHOLDER_PRINCIPAL_ID,
            verification.is_ok(),
            request.method_arn.as_str(),
        );

        AuthorizationOutcome {
            decision,
            verification,
        }
    }
}

/// Removes a case-insensitive `Bearer ` prefix, if present.
fn strip_bearer(token: &str) -> &str {
    let trimmed = token.trim();
    match trimmed.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim_start(),
        _ => trimmed,
    }
}
