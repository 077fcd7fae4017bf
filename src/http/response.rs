//! Error responses.
//!
//! # Responsibilities
//! - Map routing, body and upstream errors to HTTP status codes
//!
//! # Design Decisions
//! - Plain-text bodies; the backend owns every HTML page
//! - Oversized bodies get 413 before any backend is contacted
//! - Backend timeouts result in 504 Gateway Timeout

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::forward::ProxyError;
use crate::routing::RouteError;
use crate::security::limits::BodyReadError;

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            RouteError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
            }
        }
    }
}

impl IntoResponse for BodyReadError {
    fn into_response(self) -> Response {
        match self {
            BodyReadError::TooLarge(e) => e.into_response(),
            BodyReadError::Read(_) => {
                (StatusCode::BAD_REQUEST, "Malformed request body").into_response()
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::GATEWAY_TIMEOUT => "Upstream timed out",
            _ => "Upstream request failed",
        };
        (status, message).into_response()
    }
}
