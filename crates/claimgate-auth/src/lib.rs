//! # claimgate-auth
//!
//! Request-time bearer token authorization against a trusted identity
//! provider.
//!
//! Given a bearer token and the resource being invoked, the authorizer
//! decides `Allow` or `Deny` by verifying the token signature against the
//! provider's published key set and checking its claims.
//!
//! ## Modules
//!
//! - [`config`] - Authorizer configuration (pool id, provider, key discovery)
//! - [`jwks`] - Signing key resolution and caching
//! - [`token`] - Header decoding, claims and verification
//! - [`policy`] - Decisions and the gateway policy document
//! - [`authorizer`] - The end-to-end pipeline
//! - [`error`] - Rejection reasons
//!
//! ## Example
//!
//! ```ignore
//! use claimgate_auth::{AuthorizeRequest, AuthorizerConfig, TokenAuthorizer};
//!
//! let authorizer = TokenAuthorizer::from_config(&AuthorizerConfig::new("us-west-1_abc"))?;
//! let outcome = authorizer
//!     .authorize(&AuthorizeRequest::new(Some(token), method_arn))
//!     .await;
//! let response = outcome.decision.to_response();
//! ```

pub mod authorizer;
pub mod config;
pub mod error;
pub mod jwks;
pub mod policy;
pub mod token;

pub use authorizer::{AuthorizationOutcome, AuthorizeRequest, TokenAuthorizer};
pub use config::{AuthorizerConfig, ConfigError, JwksConfig};
pub use error::{Rejection, RejectionReason};
pub use jwks::{JwksError, KeyResolver, KeySet, SigningKey};
pub use policy::{
    AuthorizationDecision, AuthorizerResponse, Effect, PLACEHOLDER_PRINCIPAL_ID, PolicyDocument,
    Statement, generate_decision,
};
pub use token::{ClaimVerifier, TokenClaims, TokenHeader, TokenUse, parse_header};
