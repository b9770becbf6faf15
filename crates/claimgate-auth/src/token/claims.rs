//! Claims read from a verified token payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Claims of a verified token.
///
/// Only [`ClaimVerifier`](super::ClaimVerifier) produces these, after the
/// signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id).
    #[serde(rename = "sub")]
    pub subject: String,

    /// OAuth client the token was issued to. Identity tokens carry `aud`
    /// instead, in which case this is empty.
    #[serde(default)]
    pub client_id: String,

    /// Issuer URL.
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Expiration time (Unix timestamp).
    #[serde(rename = "exp")]
    pub expires_at: i64,

    /// Time the user authenticated (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Intended use of the token.
    pub token_use: TokenUse,

    /// User name, when the provider includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Value of the `token_use` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TokenUse {
    /// Access token. The only use accepted for authorization.
    Access,
    /// Identity token.
    Id,
    /// Refresh token.
    Refresh,
    /// Any other value, kept verbatim.
    Other(String),
}

impl TokenUse {
    /// Returns the claim value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Access => "access",
            Self::Id => "id",
            Self::Refresh => "refresh",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for TokenUse {
    fn from(value: String) -> Self {
        match value.as_str() {
            "access" => Self::Access,
            "id" => Self::Id,
            "refresh" => Self::Refresh,
            _ => Self::Other(value),
        }
    }
}

impl From<TokenUse> for String {
    fn from(value: TokenUse) -> Self {
        match value {
            TokenUse::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
