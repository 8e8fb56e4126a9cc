//! Route handlers.

use crate::http::cookies::{read_cookie, REFRESH_COOKIE};
use crate::http::origin::{access_token, client_origin, user_agent};
use crate::http::response::{
    error_response, issue_failure, refresh_failure, tokens_response, MSG_INVALID_GUID,
    MSG_MISSING_CREDENTIALS,
};
use crate::http::AppState;
use crate::metrics;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use std::net::SocketAddr;
use tracing::{error, info};

/// Query string of `/api/auth`.
#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    /// User GUID
    pub guid: Option<String>,
}

/// `GET /api/auth?guid=`
pub async fn issue(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    method: Method,
    uri: Uri,
) -> Response {
    let Some(guid) = query.guid.filter(|g| !g.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, MSG_INVALID_GUID, &uri, &method);
    };
    let origin = client_origin(&headers, peer, state.trust_forwarded_for);

    match state.engine.issue(&guid, &origin).await {
        Ok(tokens) => tokens_response(&tokens, Utc::now(), state.secure_cookies),
        Err(e) => {
            let (status, message) = issue_failure(&e);
            info!(code = e.code(), status = status.as_u16(), "Issue request failed");
            error_response(status, message, &uri, &method)
        }
    }
}

/// `GET /api/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    method: Method,
    uri: Uri,
) -> Response {
    let (Some(refresh_token), Some(access_token)) =
        (read_cookie(&headers, REFRESH_COOKIE), access_token(&headers))
    else {
        return error_response(StatusCode::BAD_REQUEST, MSG_MISSING_CREDENTIALS, &uri, &method);
    };
    let origin = client_origin(&headers, peer, state.trust_forwarded_for);
    let user_agent = user_agent(&headers);

    match state
        .engine
        .refresh(&refresh_token, &access_token, &origin, &user_agent)
        .await
    {
        Ok(tokens) => tokens_response(&tokens, Utc::now(), state.secure_cookies),
        Err(e) => {
            let (status, message) = refresh_failure(&e);
            info!(code = e.code(), status = status.as_u16(), "Refresh request failed");
            error_response(status, message, &uri, &method)
        }
    }
}

/// `GET /metrics`
pub async fn export_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
