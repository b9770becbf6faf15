//! Unverified token header decoding.
//!
//! Nothing decoded here is trusted. The header is read only to find the
//! `kid` of the key the token claims to be signed with.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Deserialize;

use crate::error::Rejection;

/// The part of the token header needed to locate the signing key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Key id of the signing key.
    pub kid: String,

    /// Declared algorithm. Checked later by signature verification.
    #[serde(default)]
    pub alg: Option<String>,
}

/// Runs the structural check and decodes the header of `token`.
///
/// A missing token is treated like an empty one.
///
/// # Errors
///
/// Returns `Rejection::MalformedToken` if the token has fewer than two
/// dot-separated sections, or its first section is not base64-encoded JSON
/// declaring a non-empty `kid`.
pub fn parse_header(token: Option<&str>) -> Result<TokenHeader, Rejection> {
    let token = token.unwrap_or_default();
    let sections: Vec<&str> = token.split('.').collect();
    if sections.len() < 2 {
        return Err(Rejection::malformed(format!(
            "token has {} section(s), expected at least 2",
            sections.len()
        )));
    }

    let bytes = decode_section(sections[0])
        .ok_or_else(|| Rejection::malformed("header is not valid base64"))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| Rejection::malformed(format!("header is not valid JSON: {e}")))?;

    // Struct deserialization would also accept a JSON array.
    if !value.is_object() {
        return Err(Rejection::malformed("header is not a JSON object"));
    }

    let header: TokenHeader = serde_json::from_value(value)
        .map_err(|e| Rejection::malformed(format!("header is missing a usable kid: {e}")))?;

    if header.kid.is_empty() {
        return Err(Rejection::malformed("header declares an empty kid"));
    }

    Ok(header)
}

/// Decodes a base64url section, also accepting padding and the standard
/// alphabet.
fn decode_section(section: &str) -> Option<Vec<u8>> {
    let section = section.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(section)
        .or_else(|_| STANDARD_NO_PAD.decode(section))
        .ok()
}
