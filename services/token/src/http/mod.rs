//! HTTP transport for the rotation engine.
//!
//! Maps requests onto engine calls and engine results onto status codes,
//! headers and the refresh cookie. Nothing here makes security decisions.

/// Refresh cookie handling
pub mod cookies;
/// Route handlers
pub mod handlers;
/// Request origin and credential headers
pub mod origin;
/// Response bodies and status mapping
pub mod response;

use crate::config::Config;
use crate::metrics;
use crate::rotation::RotationEngine;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Issue and refresh flows
    pub engine: Arc<RotationEngine>,
    /// Take the origin from `X-Forwarded-For`
    pub trust_forwarded_for: bool,
    /// Mark refresh cookies `Secure`
    pub secure_cookies: bool,
}

impl AppState {
    /// State with the transport flags taken from `config`.
    pub fn new(engine: Arc<RotationEngine>, config: &Config) -> Self {
        AppState {
            engine,
            trust_forwarded_for: config.trust_forwarded_for,
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Build the service router.
///
/// Handlers read the peer address, so serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth", get(handlers::issue))
        .route("/api/refresh", get(handlers::refresh))
        .route("/metrics", get(handlers::export_metrics))
        .route("/health", get(handlers::health))
        .route_layer(middleware::from_fn(track_latency))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn track_latency(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |p| p.as_str().to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::record_http_latency(&route, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}
