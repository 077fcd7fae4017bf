//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Enforce the body size limit before any route is considered
//! - Decide between static serving, default proxy, and internal fallback
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest path prefix wins; the default proxy catches everything else
//! - The internal fallback has no prefix and is never matched directly

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::routing::matcher::{Matcher, PathPrefixMatcher, ReadOnlyMethodMatcher};
use crate::routing::upstream::{InvalidUpstream, Upstream};
use crate::routing::RouteRequest;
use crate::security::limits::check_body_size;
use crate::static_files::StaticRoot;

/// What kind of handling a route selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Forward to the default backend.
    ProxyDefault,
    /// Serve from the static root, falling back when the file is missing.
    StaticAssets,
    /// Forward to the fallback backend. Only reachable from `StaticAssets`.
    InternalFallback,
}

/// A configured route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path prefix; `None` for routes that cannot be matched directly.
    pub path_prefix: Option<String>,
    pub kind: RouteKind,
}

/// The outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Serve this file from disk with the given freshness lifetime.
    ServeStatic { file: PathBuf, max_age: Duration },
    /// Forward to `target`. `internal` marks the static-miss fallback.
    Proxy { target: Upstream, internal: bool },
}

impl Decision {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::ServeStatic { .. } => "static",
            Decision::Proxy { internal: false, .. } => "proxy",
            Decision::Proxy { internal: true, .. } => "fallback",
        }
    }
}

/// Reasons a request is refused before routing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("request body of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
}

/// Resolves a request path to a servable file.
pub trait AssetLookup: Send + Sync + std::fmt::Debug {
    /// Returns the file for `path`, or `None` when nothing servable exists.
    fn lookup(&self, path: &str) -> Option<PathBuf>;
}

/// Handling selectable by a direct prefix match. The internal fallback is not
/// one of them; only a static miss produces it.
#[derive(Debug, Clone, Copy)]
enum Matched {
    Static,
    Default,
}

#[derive(Debug)]
struct CompiledRoute {
    route: Route,
    matcher: PathPrefixMatcher,
    matched: Matched,
}

/// Immutable routing table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<CompiledRoute>,
    fallback: Route,
    default_upstream: Upstream,
    fallback_upstream: Upstream,
    assets: Arc<dyn AssetLookup>,
    max_body_size: u64,
    static_max_age: Duration,
}

impl Router {
    /// Compile the routing table, resolving assets under the configured root.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, InvalidUpstream> {
        let assets = Arc::new(StaticRoot::new(&config.static_files.root));
        Self::with_assets(config, assets)
    }

    /// Compile the routing table with a custom asset resolver.
    pub fn with_assets(
        config: &ProxyConfig,
        assets: Arc<dyn AssetLookup>,
    ) -> Result<Self, InvalidUpstream> {
        let mut routes = vec![
            CompiledRoute {
                route: Route {
                    path_prefix: Some(config.static_files.prefix.clone()),
                    kind: RouteKind::StaticAssets,
                },
                matcher: PathPrefixMatcher::new(config.static_files.prefix.clone()),
                matched: Matched::Static,
            },
            CompiledRoute {
                route: Route {
                    path_prefix: Some("/".to_string()),
                    kind: RouteKind::ProxyDefault,
                },
                matcher: PathPrefixMatcher::new("/"),
                matched: Matched::Default,
            },
        ];
        routes.sort_by(|a, b| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()));

        Ok(Self {
            routes,
            fallback: Route {
                path_prefix: None,
                kind: RouteKind::InternalFallback,
            },
            default_upstream: Upstream::parse(&config.upstream.default)?,
            fallback_upstream: Upstream::parse(&config.upstream.fallback)?,
            assets,
            max_body_size: config.limits.max_body_size,
            static_max_age: Duration::from_secs(config.static_files.max_age_secs),
        })
    }

    /// All routes, externally matchable ones first in match order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .map(|compiled| &compiled.route)
            .chain(std::iter::once(&self.fallback))
    }

    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    /// Decide how to handle a request.
    pub fn route(&self, req: &RouteRequest<'_>) -> Result<Decision, RouteError> {
        check_body_size(req.body_size, self.max_body_size)?;

        let matched = self
            .routes
            .iter()
            .find(|compiled| compiled.matcher.matches(req))
            .map_or(Matched::Default, |compiled| compiled.matched);

        let decision = match matched {
            Matched::Static => self.static_or_fallback(req),
            Matched::Default => Decision::Proxy {
                target: self.default_upstream.clone(),
                internal: false,
            },
        };

        tracing::trace!(
            method = %req.method,
            path = %req.path,
            host = req.host.unwrap_or("-"),
            decision = decision.label(),
            "Routed request"
        );
        Ok(decision)
    }

    fn static_or_fallback(&self, req: &RouteRequest<'_>) -> Decision {
        let file = if ReadOnlyMethodMatcher.matches(req) {
            self.assets.lookup(req.path)
        } else {
            None
        };

        match file {
            Some(file) => Decision::ServeStatic {
                file,
                max_age: self.static_max_age,
            },
            None => Decision::Proxy {
                target: self.fallback_upstream.clone(),
                internal: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use std::collections::HashSet;

    const MIB: u64 = 1024 * 1024;

    #[derive(Debug, Default)]
    struct FakeAssets(HashSet<&'static str>);

    impl AssetLookup for FakeAssets {
        fn lookup(&self, path: &str) -> Option<PathBuf> {
            self.0
                .contains(path)
                .then(|| PathBuf::from("/public").join(path.trim_start_matches('/')))
        }
    }

    fn router(files: &[&'static str]) -> Router {
        let mut config = ProxyConfig::default();
        config.upstream.default = "app:8080".into();
        config.upstream.fallback = "localhost:8080".into();
        let assets = Arc::new(FakeAssets(files.iter().copied().collect()));
        Router::with_assets(&config, assets).unwrap()
    }

    fn request<'a>(method: &'a Method, path: &'a str, body_size: u64) -> RouteRequest<'a> {
        RouteRequest {
            method,
            path,
            host: Some("isu.example"),
            body_size,
        }
    }

    fn proxy(addr: &str, internal: bool) -> Decision {
        Decision::Proxy {
            target: addr.parse().unwrap(),
            internal,
        }
    }

    #[test]
    fn existing_image_is_served_with_one_day_max_age() {
        let router = router(&["/image/logo.png"]);
        let decision = router
            .route(&request(&Method::GET, "/image/logo.png", 0))
            .unwrap();

        assert_eq!(
            decision,
            Decision::ServeStatic {
                file: PathBuf::from("/public/image/logo.png"),
                max_age: Duration::from_secs(86_400),
            }
        );
        assert_eq!(decision.label(), "static");
    }

    #[test]
    fn missing_image_falls_back_internally() {
        let router = router(&["/image/logo.png"]);
        let decision = router
            .route(&request(&Method::GET, "/image/missing.png", 0))
            .unwrap();

        assert_eq!(decision, proxy("localhost:8080", true));
        assert_eq!(decision.label(), "fallback");
    }

    #[test]
    fn other_paths_go_to_the_default_backend() {
        let router = router(&["/image/logo.png"]);
        for path in ["/", "/api/submit", "/images/logo.png", "/image", "/@alice", "*"] {
            assert_eq!(
                router.route(&request(&Method::GET, path, 0)).unwrap(),
                proxy("app:8080", false),
                "path {path}"
            );
        }
    }

    #[test]
    fn oversized_body_is_rejected_regardless_of_path() {
        let router = router(&["/image/logo.png"]);
        for path in ["/api/submit", "/image/logo.png", "/image/missing.png"] {
            assert_eq!(
                router.route(&request(&Method::POST, path, 15 * MIB)),
                Err(RouteError::PayloadTooLarge {
                    size: 15 * MIB,
                    limit: 10 * MIB,
                })
            );
        }
    }

    #[test]
    fn body_exactly_at_limit_is_accepted() {
        let router = router(&[]);
        assert!(router
            .route(&request(&Method::POST, "/", 10 * MIB))
            .is_ok());
        assert!(router
            .route(&request(&Method::POST, "/", 10 * MIB + 1))
            .is_err());
    }

    #[test]
    fn only_get_and_head_are_served_from_disk() {
        let router = router(&["/image/logo.png"]);

        assert!(matches!(
            router.route(&request(&Method::HEAD, "/image/logo.png", 0)),
            Ok(Decision::ServeStatic { .. })
        ));
        assert_eq!(
            router
                .route(&request(&Method::POST, "/image/logo.png", 10))
                .unwrap(),
            proxy("localhost:8080", true)
        );
    }

    #[test]
    fn fallback_is_never_reached_without_the_static_prefix() {
        let router = router(&[]);
        for path in ["/", "/localhost", "/fallback", "/@app", "/initialize"] {
            let decision = router.route(&request(&Method::GET, path, 0)).unwrap();
            assert_eq!(decision, proxy("app:8080", false), "path {path}");
        }
    }

    #[test]
    fn internal_route_has_no_prefix() {
        let router = router(&[]);
        let routes: Vec<_> = router.routes().collect();

        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].kind, RouteKind::StaticAssets);
        assert_eq!(routes[1].kind, RouteKind::ProxyDefault);
        assert_eq!(
            routes[2],
            &Route {
                path_prefix: None,
                kind: RouteKind::InternalFallback,
            }
        );
    }

    #[test]
    fn matchable_routes_never_select_the_internal_fallback() {
        let router = router(&[]);
        for compiled in &router.routes {
            assert!(compiled.route.path_prefix.is_some());
            assert_ne!(compiled.route.kind, RouteKind::InternalFallback);
        }
        assert_eq!(
            router.route(&request(&Method::DELETE, "/image/x.png", 0)).unwrap(),
            proxy("localhost:8080", true)
        );
    }

    #[test]
    fn invalid_upstream_fails_compilation() {
        let mut config = ProxyConfig::default();
        config.upstream.fallback = "localhost".into();
        let err = Router::with_assets(&config, Arc::new(FakeAssets::default())).unwrap_err();
        assert_eq!(err, InvalidUpstream("localhost".into()));
    }
}
