//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (check request body size)
//!     → routing
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*) when proxied
//! ```
//!
//! # Design Decisions
//! - Fail closed: oversized bodies never reach a backend
//! - No trust in client input

pub mod headers;
pub mod limits;
