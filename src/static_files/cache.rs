//! Freshness headers for static responses.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, TimeDelta, Utc};

/// IMF-fixdate, the preferred HTTP date format (RFC 9110 §5.6.7).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// `Cache-Control` value for a freshness lifetime.
pub fn cache_control(max_age: Duration) -> HeaderValue {
    HeaderValue::from_str(&format!("max-age={}", max_age.as_secs()))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
}

/// `Expires` value `max_age` after `now`.
pub fn expires(now: DateTime<Utc>, max_age: Duration) -> HeaderValue {
    let lifetime = TimeDelta::try_seconds(i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX);
    let at = now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC);
    HeaderValue::from_str(&at.format(HTTP_DATE_FORMAT).to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

/// Stamp both freshness headers onto a response.
pub fn apply(headers: &mut HeaderMap, now: DateTime<Utc>, max_age: Duration) {
    headers.insert(header::CACHE_CONTROL, cache_control(max_age));
    headers.insert(header::EXPIRES, expires(now, max_age));
}
