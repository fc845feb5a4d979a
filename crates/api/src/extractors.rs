//! Request extractors.

use std::collections::HashMap;

use axum::{
    Form,
    extract::{
        FromRequest, FromRequestParts, Multipart, OriginalUri, Request,
        multipart::MultipartError,
    },
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use yatube_common::AppError;
use yatube_core::{ImageUpload, PostInput};
use yatube_db::entities::user;

use crate::middleware::AppState;
use crate::response::redirect;

/// Authenticated user extractor.
///
/// Anonymous requests are sent to the login page with a `next` parameter
/// pointing back at the original path and query.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Rejection for [`AuthUser`]: a redirect to the login page.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    location: String,
}

impl LoginRedirect {
    /// Redirect to `login_url`, returning to `next` afterwards.
    #[must_use]
    pub fn new(login_url: &str, next: &str) -> Self {
        // Slashes stay readable, like `/auth/login/?next=/create/`.
        let next = urlencoding::encode(next).replace("%2F", "/");
        let separator = if login_url.contains('?') { '&' } else { '?' };
        Self {
            location: format!("{login_url}{separator}next={next}"),
        }
    }

    /// Target of the redirect.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        redirect(&self.location)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<user::Model>() {
            return Ok(Self(user.clone()));
        }

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let next = uri
            .path_and_query()
            .map_or_else(|| uri.path(), |pq| pq.as_str());

        tracing::debug!(next = %next, "Redirecting anonymous request to login");
        Err(LoginRedirect::new(&state.site.login_url, next))
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// A submitted post form, from `multipart/form-data` or
/// `application/x-www-form-urlencoded`.
#[derive(Debug, Clone)]
pub struct PostFormData(pub PostInput);

impl<S> FromRequest<S> for PostFormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await.map(Self);
        }

        let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        Ok(Self(PostInput {
            text: fields.remove("text").unwrap_or_default(),
            group: fields.remove("group"),
            ..PostInput::default()
        }))
    }
}

/// Whether reading the body stopped at the route's body limit.
fn hit_body_limit(err: &MultipartError) -> bool {
    err.status() == StatusCode::PAYLOAD_TOO_LARGE
}

/// Read the post form parts. A body cut off at the limit keeps the fields
/// read so far and flags the image as too large.
async fn read_multipart(mut multipart: Multipart) -> Result<PostInput, AppError> {
    let mut input = PostInput::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if hit_body_limit(&e) => {
                input.image_too_large = true;
                break;
            }
            Err(e) => return Err(AppError::BadRequest(e.body_text())),
        };
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "text" => {
                input.text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            "group" => {
                input.group = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            "image" => {
                let file_name = field.file_name().map(ToString::to_string);
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(e) if hit_body_limit(&e) => {
                        input.image_too_large = true;
                        break;
                    }
                    Err(e) => return Err(AppError::BadRequest(e.body_text())),
                };

                // Browsers send an empty, unnamed part when no file was chosen.
                if let Some(file_name) = file_name.filter(|n| !n.is_empty()) {
                    input.image = Some(ImageUpload { file_name, data });
                }
            }
            _ => {}
        }
    }

    Ok(input)
}
