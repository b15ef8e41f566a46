//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing)
//! - Build the forwarding pipeline and aggregation composer once, from config
//! - Serve until the shutdown signal fires

use std::sync::Arc;

use axum::{body::Body, http::Request, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::aggregate::{Composer, SiteRegistry};
use crate::config::ProxyConfig;
use crate::forward::Forwarder;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::Dispatcher;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub dispatcher: Dispatcher,
    pub composer: Composer,
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and site registry.
    pub fn new(config: Arc<ProxyConfig>, registry: SiteRegistry) -> Result<Self, reqwest::Error> {
        let forwarder = Arc::new(Forwarder::from_config(&config)?);
        let composer = Composer::new(Arc::new(registry), forwarder.clone());

        let state = AppState {
            forwarder,
            dispatcher: Dispatcher::from_config(&config.dispatch),
            composer,
        };

        Ok(Self {
            router: Self::build_router(state),
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request),
            )
        });

        Router::new()
            .route("/proxy/{*target}", get(handlers::proxy))
            .route("/api/search", get(handlers::search))
            .route("/api/detail", get(handlers::detail))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(trace)
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_retries = self.config.retries.max_retries,
            timeout_ms = self.config.upstream.timeout_ms,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
