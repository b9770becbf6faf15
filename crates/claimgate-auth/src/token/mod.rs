//! Bearer token parsing and verification.
//!
//! - [`header`] - Structural check and unverified header decode
//! - [`claims`] - Claim types produced by verification
//! - [`verifier`] - Signature and claim checks against a resolved key

pub mod claims;
pub mod header;
pub mod verifier;

pub use claims::{TokenClaims, TokenUse};
pub use header::{TokenHeader, parse_header};
pub use verifier::ClaimVerifier;
