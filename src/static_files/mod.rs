//! Static asset subsystem.
//!
//! # Data Flow
//! ```text
//! Request path under the static prefix
//!     → resolve.rs (sanitize, join onto root, confine, check regular file)
//!     → routing decides ServeStatic or fallback
//!     → serve.rs (stream file, content type, range/conditional)
//!     → cache.rs (Cache-Control + Expires)
//! ```

pub mod cache;
pub mod resolve;
pub mod serve;

pub use resolve::StaticRoot;
pub use serve::serve_file;
