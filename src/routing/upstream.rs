//! Upstream backend addresses.

use std::fmt;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::validation::is_host_port;

/// An address could not be used as a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid upstream address `{0}`, expected host:port")]
pub struct InvalidUpstream(pub String);

/// A backend the edge forwards requests to, e.g. `app:8080`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    authority: Authority,
}

impl Upstream {
    pub fn parse(addr: &str) -> Result<Self, InvalidUpstream> {
        if !is_host_port(addr) {
            return Err(InvalidUpstream(addr.to_string()));
        }
        let authority = addr
            .parse::<Authority>()
            .map_err(|_| InvalidUpstream(addr.to_string()))?;
        Ok(Self { authority })
    }

    /// Authority used to build the upstream request URI.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl FromStr for Upstream {
    type Err = InvalidUpstream;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.authority.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port() {
        let upstream: Upstream = "app:8080".parse().unwrap();
        assert_eq!(upstream.authority().host(), "app");
        assert_eq!(upstream.authority().port_u16(), Some(8080));
        assert_eq!(upstream.to_string(), "app:8080");
    }

    #[test]
    fn rejects_missing_port() {
        assert_eq!(
            Upstream::parse("app"),
            Err(InvalidUpstream("app".to_string()))
        );
    }
}
