//! Response types.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A rendered page: the template name and its context.
#[derive(Debug, Serialize)]
pub struct Rendered<T: Serialize> {
    pub template: &'static str,
    pub context: T,
}

impl<T: Serialize> Rendered<T> {
    /// Render `context` with `template`.
    pub const fn new(template: &'static str, context: T) -> Self {
        Self { template, context }
    }
}

impl<T: Serialize> IntoResponse for Rendered<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Standard API response wrapper, used by the auth endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data: Some(data) }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `302 Found` to `location`.
#[must_use]
pub fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Path of a post's detail page.
#[must_use]
pub fn post_detail_url(post_id: &str) -> String {
    format!("/posts/{}/", urlencoding::encode(post_id))
}

/// Path of a user's profile page.
#[must_use]
pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}
