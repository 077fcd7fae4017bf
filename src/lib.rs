//! Edge proxy for an image-posting web application.
//!
//! Serves `/image/*` straight from disk with one-day caching, falls back to
//! an internal backend when the file is missing, forwards everything else to
//! the application backend, and refuses request bodies over 10 MiB.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod static_files;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
