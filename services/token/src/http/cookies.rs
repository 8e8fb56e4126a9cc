//! Refresh cookie formatting and parsing.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, SameSite};

/// Cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";
/// The cookie is only sent to the refresh route.
pub const REFRESH_COOKIE_PATH: &str = "/api/refresh";

/// `Set-Cookie` value carrying a refresh token until `expiry`.
pub fn refresh_cookie(
    value: &str,
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
    secure: bool,
) -> String {
    let max_age = (expiry - now).num_seconds().max(0);
    let mut builder = Cookie::build((REFRESH_COOKIE, value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path(REFRESH_COOKIE_PATH)
        .max_age(CookieDuration::seconds(max_age));
    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(expiry.timestamp()) {
        builder = builder.expires(expires);
    }
    builder.build().to_string()
}

/// First non-empty value of cookie `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_refresh_cookie_attributes() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let raw = refresh_cookie("abc.def", now + Duration::hours(1), now, false);
        let cookie = Cookie::parse(raw.as_str()).unwrap();

        assert_eq!(cookie.name(), REFRESH_COOKIE);
        assert_eq!(cookie.value(), "abc.def");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), None);
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some(REFRESH_COOKIE_PATH));
        assert_eq!(cookie.max_age(), Some(CookieDuration::hours(1)));
        assert_eq!(
            cookie.expires_datetime().map(OffsetDateTime::unix_timestamp),
            Some((now + Duration::hours(1)).timestamp())
        );
        assert!(raw.contains("Expires=Fri, 01 Mar 2024 13:00:00 GMT"));
    }

    #[test]
    fn test_refresh_cookie_secure_flag() {
        let now = Utc::now();
        let secure = refresh_cookie("a.b", now, now, true);
        assert_eq!(Cookie::parse(secure.as_str()).unwrap().secure(), Some(true));

        let lapsed = refresh_cookie("a.b", now - Duration::hours(1), now, false);
        assert!(lapsed.contains("Max-Age=0"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("session=x; refresh_token=abc.def"),
        );

        assert_eq!(read_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert!(read_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_read_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh_token="));
        assert!(read_cookie(&headers, REFRESH_COOKIE).is_none());
    }
}
