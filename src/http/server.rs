//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Measure the request body and ask the routing engine for a decision
//! - Execute the decision: serve from disk or forward upstream
//! - Swap the routing table when a reloaded config arrives
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::forward::{build_client, forward, UpstreamClient};
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::{Decision, InvalidUpstream, RouteRequest, Router as ProxyRouter};
use crate::security::limits::{buffer_limited, known_body_size};
use crate::static_files::serve_file;

/// Shared handle to the live routing table.
pub type SharedRoutes = Arc<ArcSwap<ProxyRouter>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: SharedRoutes,
    pub client: UpstreamClient,
    pub upstream_timeout: Duration,
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: SharedRoutes,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, InvalidUpstream> {
        let routes = Arc::new(ArcSwap::from_pointee(ProxyRouter::from_config(&config)?));

        let state = AppState {
            routes: routes.clone(),
            client: build_client(Duration::from_secs(config.timeouts.connect_secs)),
            upstream_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            routes,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(edge_handler))
            .route("/{*path}", any(edge_handler))
            .fallback(edge_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            default_upstream = %self.config.upstream.default,
            fallback_upstream = %self.config.upstream.fallback,
            static_root = %self.config.static_files.root,
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match ProxyRouter::from_config(&config) {
                    Ok(router) => {
                        routes.store(Arc::new(router));
                        tracing::info!("Routing table replaced");
                    }
                    Err(e) => tracing::error!(error = %e, "Ignoring reloaded config"),
                }
            }
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main edge handler.
/// Measures the body, routes, then serves or forwards.
async fn edge_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let routes = state.routes.load_full();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let request_id = request_id(&parts.headers);

    let (body_size, body) = match known_body_size(&parts.headers, &body) {
        Some(size) => (size, body),
        None => match buffer_limited(body, routes.max_body_size()).await {
            Ok(bytes) => (bytes.len() as u64, Body::from(bytes)),
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Rejected streamed body");
                let response = e.into_response();
                metrics::record_request(&method, response.status().as_u16(), metrics::REJECTED, start_time);
                return response;
            }
        },
    };

    let decision = match routes.route(&RouteRequest::from_parts(&parts, body_size)) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %parts.uri.path(), error = %e, "Request rejected");
            let response = e.into_response();
            metrics::record_request(&method, response.status().as_u16(), metrics::REJECTED, start_time);
            return response;
        }
    };

    let route = decision.label();
    tracing::debug!(request_id = %request_id, path = %parts.uri.path(), route, "Dispatching request");

    let response = match decision {
        Decision::ServeStatic { file, max_age } => serve_file(parts, &file, max_age).await,
        Decision::Proxy { target, .. } => {
            match forward(
                &state.client,
                &target,
                parts,
                body,
                peer.ip(),
                state.upstream_timeout,
            )
            .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(request_id = %request_id, upstream = %target, error = %e, "Upstream error");
                    e.into_response()
                }
            }
        }
    };

    metrics::record_request(&method, response.status().as_u16(), route, start_time);
    response
}
