//! Forwarding requests to an upstream backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream authority
//! - Keep the client's Host header
//! - Strip hop-by-hop headers both ways, add X-Forwarded-*
//! - Map upstream failures to 502 / 504
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered here
//! - Upstream requests are always HTTP/1.1
//! - One attempt per request; no retries

use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::Scheme;
use axum::http::{header, request::Parts, HeaderValue, Request, StatusCode, Uri, Version};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::routing::Upstream;
use crate::security::headers::{add_forwarded_headers, strip_hop_by_hop};

/// Pooled HTTP/1.1 client shared by all requests.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the upstream client with a connect timeout.
pub fn build_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new()).build(connector)
}

/// Errors from a single upstream exchange.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to build upstream request: {0}")]
    InvalidRequest(#[from] axum::http::Error),

    #[error("upstream {target} unreachable: {source}")]
    Connect {
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {target} failed: {source}")]
    Upstream {
        target: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    #[error("upstream {target} did not respond within {timeout:?}")]
    Timeout { target: String, timeout: Duration },
}

impl ProxyError {
    /// Status returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::InvalidRequest(_)
            | ProxyError::Connect { .. }
            | ProxyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Host the client asked for: the Host header, else the URI authority (HTTP/2).
pub fn original_host(parts: &Parts) -> Option<HeaderValue> {
    parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
    })
}

/// Build the request sent to `target` from the client's request head.
pub fn upstream_request(
    target: &Upstream,
    mut parts: Parts,
    body: Body,
    client_ip: IpAddr,
) -> Result<Request<Body>, ProxyError> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();
    let uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(target.authority().clone())
        .path_and_query(path_and_query)
        .build()?;

    let host = original_host(&parts);
    strip_hop_by_hop(&mut parts.headers);
    add_forwarded_headers(
        &mut parts.headers,
        client_ip,
        host.as_ref().and_then(|h| h.to_str().ok()),
    );
    if let Some(host) = host {
        parts.headers.insert(header::HOST, host);
    }

    parts.uri = uri;
    parts.version = Version::HTTP_11;
    Ok(Request::from_parts(parts, body))
}

/// Send the request to `target` and relay the response.
pub async fn forward(
    client: &UpstreamClient,
    target: &Upstream,
    parts: Parts,
    body: Body,
    client_ip: IpAddr,
    timeout: Duration,
) -> Result<Response, ProxyError> {
    let request = upstream_request(target, parts, body, client_ip)?;

    let response = match tokio::time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(source)) if source.is_connect() => {
            return Err(ProxyError::Connect {
                target: target.to_string(),
                source,
            })
        }
        Ok(Err(source)) => {
            return Err(ProxyError::Upstream {
                target: target.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(ProxyError::Timeout {
                target: target.to_string(),
                timeout,
            })
        }
    };

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn rewrites_uri_and_keeps_host() {
        let target: Upstream = "app:8080".parse().unwrap();
        let head = parts(
            Request::builder()
                .method("POST")
                .uri("/posts?max_created_at=2016-01-01")
                .header(header::HOST, "isu.example")
                .header(header::CONNECTION, "keep-alive")
                .header(header::CONTENT_TYPE, "multipart/form-data"),
        );

        let request =
            upstream_request(&target, head, Body::empty(), IpAddr::V4(Ipv4Addr::LOCALHOST))
                .unwrap();

        assert_eq!(
            request.uri(),
            "http://app:8080/posts?max_created_at=2016-01-01"
        );
        assert_eq!(request.method(), "POST");
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.headers()[header::HOST], "isu.example");
        assert_eq!(request.headers()["x-forwarded-host"], "isu.example");
        assert_eq!(request.headers()["x-real-ip"], "127.0.0.1");
        assert_eq!(request.headers()[header::CONTENT_TYPE], "multipart/form-data");
        assert!(request.headers().get(header::CONNECTION).is_none());
    }

    #[test]
    fn host_falls_back_to_uri_authority() {
        let target: Upstream = "localhost:8080".parse().unwrap();
        let head = parts(
            Request::builder()
                .uri("http://isu.example/image/1.jpg")
                .version(Version::HTTP_2),
        );

        let request =
            upstream_request(&target, head, Body::empty(), IpAddr::V4(Ipv4Addr::LOCALHOST))
                .unwrap();

        assert_eq!(request.uri(), "http://localhost:8080/image/1.jpg");
        assert_eq!(request.headers()[header::HOST], "isu.example");
    }

    #[test]
    fn error_statuses() {
        let timeout = ProxyError::Timeout {
            target: "app:8080".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
