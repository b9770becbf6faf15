//! HTTP front end for the claimgate token authorizer.
//!
//! Exposes `POST /authorize`, which accepts the gateway's authorizer event
//! (`authorizationToken`, `methodArn`) and answers with the policy
//! response, plus `GET /health`.

pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use handlers::AppState;
pub use server::{ClaimgateServer, ServerBuilder, build_app};
