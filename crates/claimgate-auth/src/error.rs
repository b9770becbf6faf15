//! Token rejection types.
//!
//! Every way a bearer token can fail verification maps to exactly one
//! [`Rejection`]. All of them end in a `Deny` decision; the variant is kept
//! for logging and for callers that want the reason.

use std::fmt;

use serde::Serialize;

use crate::jwks::JwksError;

/// Why a token was rejected. The first failing check wins.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// The token is missing, has fewer than two sections, or its header is
    /// not a JSON object declaring a `kid`.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// What was wrong with the token.
        message: String,
    },

    /// The header's `kid` is not in the issuer's key set.
    #[error("Unknown signing key: {kid}")]
    UnknownSigningKey {
        /// The key id declared by the token.
        kid: String,
    },

    /// The signature does not verify against the located key.
    #[error("Invalid signature: {message}")]
    InvalidSignature {
        /// Verification failure detail.
        message: String,
    },

    /// The current time is past the `exp` claim.
    #[error("Token expired at {expires_at} (now {now})")]
    Expired {
        /// The `exp` claim.
        expires_at: i64,
        /// Evaluation time.
        now: i64,
    },

    /// The `auth_time` claim lies in the future.
    #[error("Token not yet valid: auth_time {auth_time} is after now {now}")]
    NotYetValid {
        /// The `auth_time` claim.
        auth_time: i64,
        /// Evaluation time.
        now: i64,
    },

    /// The `iss` claim is not the trusted issuer.
    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    WrongIssuer {
        /// The configured issuer URL.
        expected: String,
        /// The issuer from the token.
        actual: String,
    },

    /// The `token_use` claim is not `access`.
    #[error("Wrong token use: expected access, got {actual}")]
    WrongTokenUse {
        /// The `token_use` claim.
        actual: String,
    },

    /// The issuer's key set could not be fetched.
    #[error("Key fetch failed: {0}")]
    KeyFetch(#[from] JwksError),
}

impl Rejection {
    /// Creates a new `MalformedToken` rejection.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownSigningKey` rejection.
    #[must_use]
    pub fn unknown_key(kid: impl Into<String>) -> Self {
        Self::UnknownSigningKey { kid: kid.into() }
    }

    /// Creates a new `InvalidSignature` rejection.
    #[must_use]
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    /// Creates a new `WrongIssuer` rejection.
    #[must_use]
    pub fn wrong_issuer(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::WrongIssuer {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `WrongTokenUse` rejection.
    #[must_use]
    pub fn wrong_use(actual: impl Into<String>) -> Self {
        Self::WrongTokenUse {
            actual: actual.into(),
        }
    }

    /// The reason code for this rejection.
    #[must_use]
    pub fn reason(&self) -> RejectionReason {
        match self {
            Self::MalformedToken { .. } => RejectionReason::MalformedToken,
            Self::UnknownSigningKey { .. } => RejectionReason::UnknownSigningKey,
            Self::InvalidSignature { .. } => RejectionReason::InvalidSignature,
            Self::Expired { .. } => RejectionReason::Expired,
            Self::NotYetValid { .. } => RejectionReason::NotYetValid,
            Self::WrongIssuer { .. } => RejectionReason::WrongIssuer,
            Self::WrongTokenUse { .. } => RejectionReason::WrongTokenUse,
            Self::KeyFetch(_) => RejectionReason::KeyFetchError,
        }
    }

    /// Returns `true` if the token itself was at fault, as opposed to the
    /// key set being unavailable.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        !matches!(self, Self::KeyFetch(_))
    }
}

/// Rejection reason codes, without detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// See [`Rejection::MalformedToken`].
    MalformedToken,
    /// See [`Rejection::UnknownSigningKey`].
    UnknownSigningKey,
    /// See [`Rejection::InvalidSignature`].
    InvalidSignature,
    /// See [`Rejection::Expired`].
    Expired,
    /// See [`Rejection::NotYetValid`].
    NotYetValid,
    /// See [`Rejection::WrongIssuer`].
    WrongIssuer,
    /// See [`Rejection::WrongTokenUse`].
    WrongTokenUse,
    /// See [`Rejection::KeyFetch`].
    KeyFetchError,
}

impl RejectionReason {
    /// Returns the reason code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedToken => "malformed_token",
            Self::UnknownSigningKey => "unknown_signing_key",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::WrongIssuer => "wrong_issuer",
            Self::WrongTokenUse => "wrong_token_use",
            Self::KeyFetchError => "key_fetch_error",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
