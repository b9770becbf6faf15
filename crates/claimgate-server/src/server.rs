use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use claimgate_auth::TokenAuthorizer;
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig,
    handlers::{self, AppState},
};

pub struct ClaimgateServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/authorize", post(handlers::authorize))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Builds the authorizer and router. No key discovery happens here; the
    /// key set is fetched on the first invocation.
    pub fn build(self) -> Result<ClaimgateServer, String> {
        self.config.validate()?;
        let authorizer = TokenAuthorizer::from_config(&self.config.auth)
            .map_err(|e| format!("authorizer initialization failed: {e}"))?;
        tracing::info!(issuer = %authorizer.verifier().issuer(), "authorizer ready");

        let app = build_app(
            AppState::new(authorizer),
            self.config.server.body_limit_bytes,
        );
        Ok(ClaimgateServer {
            addr: self.config.addr(),
            app,
        })
    }
}

impl ClaimgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
