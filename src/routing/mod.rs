//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path, host, body size)
//!     → router.rs (body limit, route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: Decision or RouteError
//!
//! Route Compilation (at startup and on reload):
//!     ProxyConfig
//!     → Parse upstreams
//!     → Sort prefixes longest first
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled ahead of time, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input and same files always give the same decision

pub mod matcher;
pub mod router;
pub mod upstream;

use axum::http::{header, request::Parts, Method};

pub use router::{AssetLookup, Decision, Route, RouteError, RouteKind, Router};
pub use upstream::{InvalidUpstream, Upstream};

/// The parts of a request that routing looks at.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub host: Option<&'a str>,
    pub body_size: u64,
}

impl<'a> RouteRequest<'a> {
    /// Borrow routing inputs from request head parts.
    pub fn from_parts(parts: &'a Parts, body_size: u64) -> Self {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()));

        Self {
            method: &parts.method,
            path: parts.uri.path(),
            host,
            body_size,
        }
    }
}
