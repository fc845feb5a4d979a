//! Application state and authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use yatube_common::{SharedPageCache, config::SiteConfig};
use yatube_core::{CommentService, FollowService, GroupService, PostService, UserService};

/// Name of the cookie carrying the access token.
pub const TOKEN_COOKIE: &str = "token";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub group_service: GroupService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub page_cache: SharedPageCache,
    pub site: SiteConfig,
    /// Body limit for the create and edit post forms.
    pub upload_limit: usize,
}

/// Authentication middleware.
///
/// Reads a token from `Authorization: Bearer <token>` or the `token` cookie
/// and, when it resolves, puts the user into the request extensions. Unknown
/// tokens leave the request anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = request_token(&req) {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) if e.is_server_error() => {
                tracing::warn!(error = %e, "Token lookup failed");
            }
            Err(_) => {
                tracing::debug!("Ignoring unknown access token");
            }
        }
    }

    next.run(req).await
}

fn request_token(req: &Request<Body>) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(req.headers())
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(header_name: &str, value: &str) -> Request<Body> {
        Request::builder()
            .uri("/")
            .header(header_name, value)
            .body(Body::empty())
            .unwrap_or_default()
    }

    #[test]
    fn test_bearer_token() {
        let req = request("Authorization", "Bearer abc123");
        assert_eq!(request_token(&req).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_cookie_token() {
        let req = request("Cookie", "theme=dark; token=xyz");
        assert_eq!(request_token(&req).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let req = Request::builder()
            .uri("/")
            .header("Authorization", "Bearer from-header")
            .header("Cookie", "token=from-cookie")
            .body(Body::empty())
            .unwrap_or_default();
        assert_eq!(request_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token() {
        let req = request("Authorization", "Basic dXNlcjpwYXNz");
        assert_eq!(request_token(&req), None);
    }
}
