//! Error types for yatube-rs.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Rejected credentials or token (sign-in, token auth).
    #[error("Unauthorized")]
    Unauthorized,

    /// Renders the 403 page. Site routes answer denied actions with a
    /// redirect instead, so nothing in them raises this yet.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_)
            | Self::UserNotFound(_)
            | Self::PostNotFound(_)
            | Self::GroupNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::Database(_)
            | Self::Cache(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::PostNotFound(_) => "POST_NOT_FOUND",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the error page template this error renders with.
    ///
    /// Client errors without a dedicated page (bad request, validation,
    /// conflict, unauthorized) share `core/400.html`.
    #[must_use]
    pub fn template(&self) -> &'static str {
        match self.status_code() {
            StatusCode::NOT_FOUND => "core/404.html",
            StatusCode::FORBIDDEN => "core/403.html",
            status if status.is_server_error() => "core/500.html",
            _ => "core/400.html",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "template": self.template(),
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_share_status_and_template() {
        for err in [
            AppError::NotFound("x".to_string()),
            AppError::UserNotFound("alice".to_string()),
            AppError::PostNotFound("p1".to_string()),
            AppError::GroupNotFound("cats".to_string()),
        ] {
            assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
            assert_eq!(err.template(), "core/404.html");
        }
    }

    #[test]
    fn test_forbidden_renders_403_page() {
        let err = AppError::Forbidden("csrf".to_string());
        assert_eq!(err.template(), "core/403.html");
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_other_client_errors_render_400_page() {
        for err in [
            AppError::Unauthorized,
            AppError::BadRequest("bad multipart".to_string()),
            AppError::Validation("password too short".to_string()),
            AppError::Conflict("username taken".to_string()),
        ] {
            assert!(err.status_code().is_client_error());
            assert_eq!(err.template(), "core/400.html");
        }
    }

    #[test]
    fn test_server_errors_render_500_page() {
        let err = AppError::Database("connection reset".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.template(), "core/500.html");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = AppError::PostNotFound("p1".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
