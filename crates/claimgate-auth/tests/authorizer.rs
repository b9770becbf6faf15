//! End-to-end authorizer tests against a mock key discovery endpoint.

mod common;

use std::time::Duration;

use claimgate_auth::{AuthorizeRequest, Effect, JwksConfig, RejectionReason};
use common::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request(token: &str) -> AuthorizeRequest {
    AuthorizeRequest::new(Some(token), RESOURCE)
}

#[tokio::test]
async fn valid_access_token_is_allowed_for_requested_resource() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);

    let token = sign(&access_claims(&issuer(&server)));
    let outcome = authorizer.authorize(&request(&token)).await;

    assert_eq!(outcome.decision.effect, Effect::Allow);
    assert_eq!(outcome.decision.resource, RESOURCE);
    assert_eq!(outcome.decision.principal_id, "user");
    assert!(outcome.reason().is_none());

    let claims = outcome.claims().unwrap();
    assert_eq!(claims.subject, "alice-sub");
    assert_eq!(claims.client_id, "client-1");
}

#[tokio::test]
async fn identity_token_is_denied_as_wrong_use() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);

    let mut claims = access_claims(&issuer(&server));
    claims["token_use"] = json!("id");
    let outcome = authorizer.authorize(&request(&sign(&claims))).await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.decision.resource, RESOURCE);
    assert_eq!(outcome.reason(), Some(RejectionReason::WrongTokenUse));
}

#[tokio::test]
async fn each_failed_check_yields_its_own_reason() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);
    let issuer = issuer(&server);
    let now = now();

    let mut expired = access_claims(&issuer);
    expired["exp"] = json!(now - 5);

    let mut future_auth = access_claims(&issuer);
    future_auth["auth_time"] = json!(now + 600);

    let mut foreign = access_claims(&issuer);
    foreign["iss"] = json!("https://idp.example/pool-999");

    let cases = [
        (sign(&expired), RejectionReason::Expired),
        (sign(&future_auth), RejectionReason::NotYetValid),
        (sign(&foreign), RejectionReason::WrongIssuer),
        // Rogue key signing under the legitimate key's id.
        (
            sign_with(ROGUE_PEM, "k1", &access_claims(&issuer)),
            RejectionReason::InvalidSignature,
        ),
        ("only-one-section".to_string(), RejectionReason::MalformedToken),
    ];

    for (token, expected) in cases {
        let outcome = authorizer.authorize(&request(&token)).await;
        assert_eq!(outcome.decision.effect, Effect::Deny, "{expected}");
        assert_eq!(outcome.decision.resource, RESOURCE);
        assert_eq!(outcome.reason(), Some(expected));
    }
}

#[tokio::test]
async fn wrong_issuer_is_denied_even_with_valid_signature_from_other_published_key() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);

    let mut claims = access_claims(&issuer(&server));
    claims["iss"] = json!("https://attacker.example/pool-123");
    let token = sign_with(ROGUE_PEM, "k2", &claims);

    let outcome = authorizer.authorize(&request(&token)).await;
    assert_eq!(outcome.reason(), Some(RejectionReason::WrongIssuer));
}

#[tokio::test]
async fn unknown_key_id_does_not_refetch_populated_cache() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);
    let claims = access_claims(&issuer(&server));

    let allowed = authorizer.authorize(&request(&sign(&claims))).await;
    assert_eq!(allowed.decision.effect, Effect::Allow);

    let unknown = sign_with(SIGNING_PEM, "rotated-key", &claims);
    for _ in 0..2 {
        let outcome = authorizer.authorize(&request(&unknown)).await;
        assert_eq!(outcome.decision.effect, Effect::Deny);
        assert_eq!(outcome.reason(), Some(RejectionReason::UnknownSigningKey));
    }
    // `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn server_error_on_cold_cache_denies_and_next_call_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_jwks(&server, 1).await;

    let authorizer = authorizer_for(&server);
    let token = sign(&access_claims(&issuer(&server)));

    let first = authorizer.authorize(&request(&token)).await;
    assert_eq!(first.decision.effect, Effect::Deny);
    assert_eq!(first.decision.resource, RESOURCE);
    assert_eq!(first.reason(), Some(RejectionReason::KeyFetchError));
    assert!(!authorizer.resolver().is_cached().await);

    let second = authorizer.authorize(&request(&token)).await;
    assert_eq!(second.decision.effect, Effect::Allow);
    assert!(authorizer.resolver().is_cached().await);
}

#[tokio::test]
async fn malformed_key_set_is_a_key_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;
    let authorizer = authorizer_for(&server);

    let token = sign(&access_claims(&issuer(&server)));
    let outcome = authorizer.authorize(&request(&token)).await;

    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.reason(), Some(RejectionReason::KeyFetchError));
    assert!(!authorizer.resolver().is_cached().await);
}

#[tokio::test]
async fn hung_key_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = JwksConfig {
        request_timeout: Duration::from_millis(200),
        ..jwks_config()
    };
    let authorizer = authorizer_with(&server, config);

    let token = sign(&access_claims(&issuer(&server)));
    let outcome = authorizer.authorize(&request(&token)).await;

    assert_eq!(outcome.reason(), Some(RejectionReason::KeyFetchError));
    assert!(!authorizer.resolver().is_cached().await);
}

#[tokio::test]
async fn decisions_are_idempotent_across_cache_warmth() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);
    let token = sign(&access_claims(&issuer(&server)));

    let cold = authorizer.authorize(&request(&token)).await;
    let warm = authorizer.authorize(&request(&token)).await;

    assert_eq!(cold.decision, warm.decision);
    assert_eq!(cold.decision.to_response(), warm.decision.to_response());
}

#[tokio::test]
async fn concurrent_cold_cache_callers_all_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
        .mount(&server)
        .await;

    let authorizer = std::sync::Arc::new(authorizer_for(&server));
    let token = sign(&access_claims(&issuer(&server)));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let authorizer = authorizer.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            authorizer.authorize(&request(&token)).await.decision
        }));
    }

    for handle in handles {
        let decision = handle.await.unwrap();
        assert_eq!(decision.effect, Effect::Allow);
        assert_eq!(decision.resource, RESOURCE);
    }

    let fetches = server.received_requests().await.unwrap().len();
    assert!((1..=8).contains(&fetches));
    assert!(authorizer.resolver().is_cached().await);
}

#[tokio::test]
async fn bearer_scheme_prefix_is_accepted() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let authorizer = authorizer_for(&server);

    let token = format!("Bearer {}", sign(&access_claims(&issuer(&server))));
    let outcome = authorizer.authorize(&request(&token)).await;
    assert_eq!(outcome.decision.effect, Effect::Allow);
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let server = MockServer::start().await;
    mount_jwks(&server, 2).await;
    let authorizer = authorizer_for(&server);
    let token = sign(&access_claims(&issuer(&server)));

    assert!(authorizer.authorize(&request(&token)).await.decision.is_allowed());
    authorizer.resolver().invalidate().await;
    assert!(authorizer.authorize(&request(&token)).await.decision.is_allowed());
}

#[tokio::test]
async fn refresh_ttl_refetches_stale_key_set() {
    let server = MockServer::start().await;
    mount_jwks(&server, 2).await;
    let config = JwksConfig {
        refresh_ttl: Some(Duration::from_millis(50)),
        ..jwks_config()
    };
    let authorizer = authorizer_with(&server, config);
    let token = sign(&access_claims(&issuer(&server)));

    assert!(authorizer.authorize(&request(&token)).await.decision.is_allowed());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(authorizer.authorize(&request(&token)).await.decision.is_allowed());
}

#[tokio::test]
async fn missing_token_is_denied_without_contacting_provider() {
    let server = MockServer::start().await;
    mount_jwks(&server, 0).await;
    let authorizer = authorizer_for(&server);

    let outcome = authorizer
        .authorize(&AuthorizeRequest::new(None::<String>, RESOURCE))
        .await;
    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.reason(), Some(RejectionReason::MalformedToken));
}

#[tokio::test]
async fn array_header_naming_published_key_is_malformed() {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let server = MockServer::start().await;
    mount_jwks(&server, 0).await;
    let authorizer = authorizer_for(&server);

    // Keep a genuine payload and signature; only the header shape changes.
    let signed = sign(&access_claims(&issuer(&server)));
    let (_, rest) = signed.split_once('.').unwrap();
    let token = format!("{}.{rest}", URL_SAFE_NO_PAD.encode(r#"["k1","RS256"]"#));

    let outcome = authorizer.authorize(&request(&token)).await;
    assert_eq!(outcome.decision.effect, Effect::Deny);
    assert_eq!(outcome.decision.resource, RESOURCE);
    assert_eq!(outcome.reason(), Some(RejectionReason::MalformedToken));
    assert!(!authorizer.resolver().is_cached().await);
}
