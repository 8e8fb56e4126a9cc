//! Response shapes and status mapping.

use crate::error::TokenError;
use crate::http::cookies::refresh_cookie;
use crate::rotation::IssuedTokens;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

/// Issue rejected for any GUID problem.
pub const MSG_INVALID_GUID: &str = "guid is missing, malformed or unknown";
/// Refresh without cookie or header.
pub const MSG_MISSING_CREDENTIALS: &str =
    "request must carry the refresh_token cookie and an Authorization header";
/// Any credential rejection.
pub const MSG_UNAUTHORIZED: &str = "invalid or expired credentials";
/// Server fault.
pub const MSG_INTERNAL: &str = "internal server error";

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Client-facing message
    pub error: String,
    /// Request path
    pub path: String,
    /// Request method
    pub method: String,
    /// RFC 3339 timestamp
    pub time: String,
}

/// JSON error response for the current request.
pub fn error_response(status: StatusCode, message: &str, uri: &Uri, method: &Method) -> Response {
    let body = ErrorBody {
        error: message.to_string(),
        path: uri.path().to_string(),
        method: method.to_string(),
        time: Utc::now().to_rfc3339(),
    };
    (status, Json(body)).into_response()
}

/// Status code and client-facing message for an issue failure.
pub fn issue_failure(err: &TokenError) -> (StatusCode, &'static str) {
    if err.is_server_fault() {
        (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
    } else {
        (StatusCode::BAD_REQUEST, MSG_INVALID_GUID)
    }
}

/// Status code and client-facing message for a refresh failure.
pub fn refresh_failure(err: &TokenError) -> (StatusCode, &'static str) {
    if err.is_server_fault() {
        (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
    } else if err.is_credential_rejection() {
        (StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED)
    } else {
        (StatusCode::BAD_REQUEST, MSG_MISSING_CREDENTIALS)
    }
}

/// 200 with the access token in `Authorization` and the refresh cookie.
pub fn tokens_response(tokens: &IssuedTokens, now: DateTime<Utc>, secure_cookies: bool) -> Response {
    let cookie = refresh_cookie(&tokens.refresh_token, tokens.refresh_expiry, now, secure_cookies);

    let headers = HeaderValue::from_str(&tokens.access_token)
        .and_then(|auth| HeaderValue::from_str(&cookie).map(|cookie| (auth, cookie)));
    match headers {
        Ok((auth, cookie)) => (
            StatusCode::OK,
            [(header::AUTHORIZATION, auth), (header::SET_COOKIE, cookie)],
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Token pair is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
