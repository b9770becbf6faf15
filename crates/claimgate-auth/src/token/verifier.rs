//! Signature and claim verification.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Signature, with the algorithm from the token header
//! 2. Expiry (`exp`) and authentication time (`auth_time`)
//! 3. Issuer (`iss`), exact match
//! 4. Intended use (`token_use` must be `access`)
//!
//! Time comparisons use whole Unix seconds with no leeway. The structural
//! check and key lookup happen before this module is reached.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use time::OffsetDateTime;

use super::claims::{TokenClaims, TokenUse};
use crate::error::Rejection;
use crate::jwks::SigningKey;

/// Verifies tokens for a single trusted issuer.
#[derive(Debug, Clone)]
pub struct ClaimVerifier {
    issuer: String,
}

impl ClaimVerifier {
    /// Creates a verifier that trusts `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// The trusted issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verifies `token` against `key` at the current time.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`Rejection`].
    pub fn verify(&self, token: &str, key: &SigningKey) -> Result<TokenClaims, Rejection> {
        self.verify_at(token, key, now_seconds())
    }

    /// Verifies `token` against `key` as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`Rejection`].
    pub fn verify_at(
        &self,
        token: &str,
        key: &SigningKey,
        now: i64,
    ) -> Result<TokenClaims, Rejection> {
        let claims = verify_signature(token, key)?;

        if now > claims.expires_at {
            return Err(Rejection::Expired {
                expires_at: claims.expires_at,
                now,
            });
        }

        if let Some(auth_time) = claims.auth_time
            && now < auth_time
        {
            return Err(Rejection::NotYetValid { auth_time, now });
        }

        if claims.issuer != self.issuer {
            return Err(Rejection::wrong_issuer(&self.issuer, &claims.issuer));
        }

        if claims.token_use != TokenUse::Access {
            return Err(Rejection::wrong_use(claims.token_use.as_str()));
        }

        Ok(claims)
    }
}

/// Current wall-clock time in whole Unix seconds.
#[must_use]
pub fn now_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Checks the signature and returns the decoded claims.
///
/// Registered-claim validation in `jsonwebtoken` is switched off; those
/// checks run afterwards in a fixed order.
fn verify_signature(token: &str, key: &SigningKey) -> Result<TokenClaims, Rejection> {
    let header = decode_header(token).map_err(|e| Rejection::invalid_signature(e.to_string()))?;

    if let Some(expected) = key.algorithm()
        && expected != header.alg
    {
        return Err(Rejection::invalid_signature(format!(
            "token algorithm {:?} does not match key algorithm {:?}",
            header.alg, expected
        )));
    }

    let mut validation = Validation::new(header.alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, key.decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            // Signature already checked out; the payload is unusable.
            ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                Rejection::malformed(format!("claims could not be read: {err}"))
            }
            _ => Rejection::invalid_signature(err.to_string()),
        })
}
