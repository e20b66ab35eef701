//! Development-only blob storage proxy.

use axum::body::Body;
use axum::extract::{OriginalUri, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::BLOB_PROXY_PREFIX;
use crate::proxy::blob_upstream_url;

/// `GET /api/blob/*path`: forward to the configured blob origin.
///
/// The path is taken from the raw request URI so percent-escapes reach
/// the upstream unchanged. The body is streamed back.
pub async fn forward(
    State(ctx): State<ApiContext>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    let path = uri
        .path()
        .strip_prefix(BLOB_PROXY_PREFIX)
        .ok_or_else(|| ApiError::NotFound(uri.path().to_string()))?;
    let upstream = blob_upstream_url(&ctx.config.proxy, path, uri.query())
        .ok_or_else(|| ApiError::Internal("invalid BLOB_PROXY_TARGET".into()))?;

    tracing::debug!(path, "Proxying blob request");

    let response = ctx
        .http
        .get(upstream)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let status = response.status();
    let headers = response.headers().clone();

    let mut forwarded = Response::new(Body::from_stream(response.bytes_stream()));
    *forwarded.status_mut() = status;
    for name in [CONTENT_TYPE, CONTENT_LENGTH] {
        if let Some(value) = headers.get(&name) {
            forwarded.headers_mut().insert(name, value.clone());
        }
    }
    Ok(forwarded)
}
