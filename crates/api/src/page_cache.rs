//! Whole-page caching middleware for the home feed.

use std::time::Duration;

use axum::{
    body::{Body, HttpBody, to_bytes},
    extract::State,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use yatube_common::{AppError, CachedPage};

use crate::middleware::AppState;

/// Largest body the cache will buffer. Bigger pages are served uncached.
pub const MAX_CACHED_BODY: usize = 4 * 1024 * 1024;

/// Serve `GET` requests from the page cache, storing successful responses
/// under their path and query for `site.index_cache_secs`.
///
/// Cache failures never fail the request: they are logged and the page is
/// rendered normally.
pub async fn cache_page(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);

    match state.page_cache.get(&key).await {
        Ok(Some(page)) => return cached_response(page),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, key = %key, "Page cache lookup failed"),
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    if body
        .size_hint()
        .upper()
        .is_none_or(|len| len > MAX_CACHED_BODY as u64)
    {
        tracing::debug!(key = %key, "Page too large or unsized, not caching");
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return AppError::Internal(format!("Failed to buffer page {key}: {e}"))
                .into_response();
        }
    };

    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => {
            let page = CachedPage {
                status: parts.status.as_u16(),
                content_type: parts
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string),
                body: text,
            };
            let ttl = Duration::from_secs(state.site.index_cache_secs);
            if let Err(e) = state.page_cache.set(&key, page, ttl).await {
                tracing::warn!(error = %e, key = %key, "Failed to store page in cache");
            }
        }
        Err(_) => tracing::debug!(key = %key, "Skipping cache for non-UTF-8 page"),
    }

    Response::from_parts(parts, Body::from(bytes))
}

fn cached_response(page: CachedPage) -> Response {
    let status = StatusCode::from_u16(page.status).unwrap_or(StatusCode::OK);
    let mut response = (status, page.body).into_response();

    if let Some(content_type) = page
        .content_type
        .and_then(|ct| header::HeaderValue::from_str(&ct).ok())
    {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_response_restores_page() {
        let response = cached_response(CachedPage {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: r#"{"template":"posts/index.html"}"#.to_string(),
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"template":"posts/index.html"}"#);
    }
}
