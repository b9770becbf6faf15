use std::sync::Arc;

use axum::{Json, extract::State};
use claimgate_auth::{AuthorizeRequest, AuthorizerResponse, TokenAuthorizer};
use serde_json::{Value, json};

#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<TokenAuthorizer>,
}

impl AppState {
    pub fn new(authorizer: TokenAuthorizer) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }
}

/// Gateway authorizer invocation.
///
/// Always answers 200 with the policy response; a rejected token is a
/// `Deny` document, never an HTTP error.
pub async fn authorize(
    State(state): State<AppState>,
    Json(request): Json<AuthorizeRequest>,
) -> Json<AuthorizerResponse> {
    let outcome = state.authorizer.authorize(&request).await;
    Json(outcome.decision.to_response())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "issuer": state.authorizer.verifier().issuer(),
        "keys_cached": state.authorizer.resolver().is_cached().await,
    }))
}
