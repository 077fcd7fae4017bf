//! Streaming a resolved file back to the client.

use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{request::Parts, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::static_files::cache;

/// Serve `file` for the request described by `parts`.
///
/// Content type comes from the file extension. Conditional and range
/// requests are honoured. Successful responses carry freshness headers.
pub async fn serve_file(parts: Parts, file: &Path, max_age: Duration) -> Response {
    let request = Request::from_parts(parts, Body::empty());

    let mut response = match ServeFile::new(file).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        cache::apply(response.headers_mut(), Utc::now(), max_age);
    } else {
        tracing::debug!(file = %file.display(), status = %status, "Static file not served");
    }
    response.into_response()
}
