//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → security::limits (measure body, 413 when too large)
//!     → routing (ServeStatic | Proxy)
//!     → static_files::serve  or  forward.rs (upstream exchange)
//!     → response.rs (error statuses)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ProxyError, UpstreamClient};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, SharedRoutes};
