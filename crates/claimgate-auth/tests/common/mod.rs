//! Shared fixtures: RSA test keys, token signing and a mock JWKS endpoint.

#![allow(dead_code)]

use std::time::Duration;

use claimgate_auth::{AuthorizerConfig, JwksConfig, TokenAuthorizer};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};
use time::OffsetDateTime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const POOL_ID: &str = "pool-123";
pub const JWKS_PATH: &str = "/pool-123/.well-known/jwks.json";
pub const RESOURCE: &str = "arn:aws:execute-api:us-west-1:123456789012:abc123/prod/GET/items";

pub const SIGNING_PEM: &str = include_str!("../fixtures/signing_key.pem");
pub const SIGNING_MODULUS: &str = include_str!("../fixtures/signing_key.n");
pub const ROGUE_PEM: &str = include_str!("../fixtures/rogue_key.pem");
pub const ROGUE_MODULUS: &str = include_str!("../fixtures/rogue_key.n");

pub fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

pub fn rsa_jwk(kid: &str, modulus: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": modulus.trim(),
        "e": "AQAB"
    })
}

/// Key set publishing the signing key as `k1` and the rogue key as `k2`.
pub fn jwks_body() -> Value {
    json!({
        "keys": [
            rsa_jwk("k1", SIGNING_MODULUS),
            rsa_jwk("k2", ROGUE_MODULUS)
        ]
    })
}

pub fn issuer(server: &MockServer) -> String {
    format!("{}/{}", server.uri(), POOL_ID)
}

/// Claims that pass every check for `issuer`.
pub fn access_claims(issuer: &str) -> Value {
    let now = now();
    json!({
        "sub": "alice-sub",
        "client_id": "client-1",
        "iss": issuer,
        "exp": now + 3600,
        "auth_time": now - 10,
        "token_use": "access",
        "username": "alice"
    })
}

pub fn sign_with(pem: &str, kid: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("test key");
    encode(&header, claims, &key).expect("sign token")
}

/// Signs with the key published as `k1`.
pub fn sign(claims: &Value) -> String {
    sign_with(SIGNING_PEM, "k1", claims)
}

pub fn jwks_config() -> JwksConfig {
    JwksConfig {
        allow_http: true,
        request_timeout: Duration::from_secs(2),
        ..JwksConfig::default()
    }
}

pub fn authorizer_for(server: &MockServer) -> TokenAuthorizer {
    authorizer_with(server, jwks_config())
}

pub fn authorizer_with(server: &MockServer, jwks: JwksConfig) -> TokenAuthorizer {
    let config = AuthorizerConfig::new(POOL_ID)
        .with_provider_url(server.uri())
        .with_jwks(jwks);
    TokenAuthorizer::from_config(&config).expect("authorizer")
}

/// Mounts a JWKS endpoint that must be hit exactly `times` times.
pub async fn mount_jwks(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .expect(times)
        .mount(server)
        .await;
}
