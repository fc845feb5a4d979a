//! Site routes.

mod auth;
mod comments;
mod follows;
mod posts;

use axum::{Router, http::Uri, middleware::from_fn_with_state, routing::get};
use yatube_common::AppError;

use crate::middleware::AppState;
use crate::page_cache::cache_page;

/// Unknown routes render the 404 page.
async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

/// Create the site router. Only the home feed goes through the page cache.
pub fn router(state: AppState) -> Router<AppState> {
    let upload_limit = state.upload_limit;
    let index = Router::new()
        .route("/", get(posts::index))
        .route_layer(from_fn_with_state(state, cache_page));

    Router::new()
        .merge(index)
        .merge(posts::router(upload_limit))
        .merge(comments::router())
        .merge(follows::router())
        .merge(auth::router())
        .fallback(not_found)
}
