//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use yatube_common::AppResult;
use yatube_core::SignupInput;
use yatube_db::entities::user;

use crate::{
    middleware::{AppState, TOKEN_COOKIE},
    response::{ApiResponse, Rendered},
};

/// Issued credentials.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Signin request.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

/// Context of the login page.
#[derive(Debug, Serialize)]
pub struct LoginPage {
    /// Where to go after signing in.
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

fn issue(jar: CookieJar, user: user::Model) -> (CookieJar, ApiResponse<TokenResponse>) {
    let token = user.token.unwrap_or_default();

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    (
        jar.add(cookie),
        ApiResponse::ok(TokenResponse {
            id: user.id,
            username: user.username,
            token,
        }),
    )
}

/// Create a new account and sign it in.
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<SignupInput>,
) -> AppResult<(CookieJar, ApiResponse<TokenResponse>)> {
    let user = state.user_service.signup(input).await?;
    Ok(issue(jar, user))
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> AppResult<(CookieJar, ApiResponse<TokenResponse>)> {
    let user = state
        .user_service
        .signin(&req.username, &req.password)
        .await?;
    Ok(issue(jar, user))
}

async fn login_page(Query(query): Query<LoginQuery>) -> Rendered<LoginPage> {
    Rendered::new("users/login.html", LoginPage { next: query.next })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup/", post(signup))
        .route("/auth/login/", get(login_page).post(signin))
}
