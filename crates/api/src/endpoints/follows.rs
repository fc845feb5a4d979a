//! Follow endpoints.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::get,
};
use yatube_common::AppResult;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{profile_url, redirect},
};

/// Follow an author, then show their profile.
async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let outcome = state.follow_service.follow(&user, &username).await?;
    tracing::debug!(user_id = %user.id, author = %username, outcome = ?outcome, "Follow request handled");

    Ok(redirect(&profile_url(&username)))
}

/// Unfollow an author, then show their profile.
async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    state.follow_service.unfollow(&user, &username).await?;
    Ok(redirect(&profile_url(&username)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
}
