//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatcher on every path
//! - Configure HTTP/1.1 and HTTP/2 support
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Design Decisions
//! - No router-level timeout: the only bound is the upstream deadline in
//!   the dispatcher, so a slow backend is reported as a fault envelope

use axum::{body::Body, routing::any, Router};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig};
use crate::config::validation::ValidationError;
use crate::http::dispatcher::dispatch;
use crate::http::policy::CommentPolicy;
use crate::http::upstream::UpstreamBase;
use crate::registry::BackendRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub upstream: Arc<UpstreamBase>,
    pub comment_policy: Arc<CommentPolicy>,
    pub client: Client<HttpConnector, Body>,
    pub upstream_timeout: Duration,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server routing through `registry`.
    pub fn new(config: &ProxyConfig, registry: Arc<BackendRegistry>) -> Result<Self, ConfigError> {
        let upstream = UpstreamBase::parse(&config.repository.url).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidRepositoryUrl(e.to_string())])
        })?;
        let comment_policy = CommentPolicy::new(&config.repository.commit_regexp).map_err(|e| {
            ConfigError::Validation(vec![ValidationError::InvalidCommitRegexp(e.to_string())])
        })?;

        tracing::info!(pattern = %comment_policy.as_str(), "Using commit regexp");

        // Initialize HTTP Client
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            registry,
            upstream: Arc::new(upstream),
            comment_policy: Arc::new(comment_policy),
            client,
            upstream_timeout: config.timeouts.upstream(),
        };

        Ok(Self {
            router: Self::build_router(state),
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request ID is set before the trace span opens and echoed on the
    /// response.
    fn build_router(state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id());

        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
