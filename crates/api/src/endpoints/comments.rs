//! Comment endpoints.

use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    response::Response,
    routing::post,
};
use serde::Deserialize;
use yatube_common::AppResult;
use yatube_core::Submission;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{post_detail_url, redirect},
};

/// Submitted comment form.
#[derive(Debug, Default, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Add a comment and go back to the post. A blank or unreadable form is
/// dropped and redirects all the same.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    form: Result<Form<CommentRequest>, FormRejection>,
) -> AppResult<Response> {
    let req = form.map(|Form(req)| req).unwrap_or_else(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable comment form");
        CommentRequest::default()
    });

    if let Submission::Invalid(errors) = state
        .comment_service
        .add_comment(&post_id, &user, &req.text)
        .await?
    {
        tracing::debug!(post_id = %post_id, errors = ?errors, "Comment rejected");
    }

    Ok(redirect(&post_detail_url(&post_id)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/posts/{post_id}/comment/", post(add_comment))
}
