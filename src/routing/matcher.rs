//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefix (case-sensitive)
//! - Match request methods
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use axum::http::Method;

use crate::routing::RouteRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RouteRequest<'_>) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        req.path.starts_with(&self.prefix)
    }
}

/// Matches requests that can be answered from disk (GET and HEAD).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyMethodMatcher;

impl Matcher for ReadOnlyMethodMatcher {
    fn matches(&self, req: &RouteRequest<'_>) -> bool {
        *req.method == Method::GET || *req.method == Method::HEAD
    }
}
