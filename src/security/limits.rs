//! Request body limits.
//!
//! # Responsibilities
//! - Enforce maximum request body size
//! - Learn the size of bodies sent without `Content-Length`
//!
//! # Design Decisions
//! - Limits checked before routing (early rejection)
//! - Declared `Content-Length` is trusted; hyper enforces the framing
//! - Any other body of unknown length is buffered up to the limit and no
//!   further, whatever the protocol (HTTP/2 never sends `Transfer-Encoding`)

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderMap};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use thiserror::Error;

use crate::routing::RouteError;

/// Reject bodies larger than `limit`. A body of exactly `limit` bytes passes.
pub fn check_body_size(size: u64, limit: u64) -> Result<(), RouteError> {
    if size > limit {
        return Err(RouteError::PayloadTooLarge { size, limit });
    }
    Ok(())
}

/// Body size announced by `Content-Length`, if any.
pub fn declared_body_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Body size known without reading the body: the declared `Content-Length`,
/// else the exact size the body itself reports. `None` means it must be read.
pub fn known_body_size(headers: &HeaderMap, body: &Body) -> Option<u64> {
    declared_body_size(headers).or_else(|| body.size_hint().exact())
}

/// Failure while buffering a streamed body.
#[derive(Debug, Error)]
pub enum BodyReadError {
    /// The body grew past the limit; the reported size is `limit + 1`.
    #[error(transparent)]
    TooLarge(#[from] RouteError),

    /// The client connection failed mid-body.
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Buffer a streamed body, stopping as soon as it exceeds `limit`.
pub async fn buffer_limited(body: Body, limit: u64) -> Result<Bytes, BodyReadError> {
    let cap = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, cap).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(RouteError::PayloadTooLarge {
            size: limit.saturating_add(1),
            limit,
        }
        .into()),
        Err(e) => Err(BodyReadError::Read(e.to_string())),
    }
}
