use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use service::auth::AuthError;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// JSON error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorBody {
    /// One of validation, conflict, not_found, unauthorized, forbidden, invalid_token or internal
    #[schema(value_type = String)]
    pub error: &'static str,
    pub code: u16,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// 401 for a missing or unusable bearer credential.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorBody { error: "unauthorized", code: AuthError::Unauthorized.code(), message: message.into() },
        }
    }

    /// 401 carrying the fixed invalid-token message.
    pub fn invalid_bearer() -> Self {
        let e = AuthError::InvalidToken;
        Self {
            status: StatusCode::UNAUTHORIZED,
            body: ErrorBody { error: e.kind(), code: e.code(), message: e.public_message() },
        }
    }
}

pub fn status_for(e: &AuthError) -> StatusCode {
    match e {
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::InvalidToken => StatusCode::BAD_REQUEST,
        AuthError::Hash(_) | AuthError::Token(_) | AuthError::Repository(_) | AuthError::Delivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        if e.is_internal() {
            error!(code = e.code(), error = %e, "request failed");
        }
        Self { status: status_for(&e), body: ErrorBody { error: e.kind(), code: e.code(), message: e.public_message() } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("mail transport: {0}")]
    Mail(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::auth::errors::ConflictReason;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(status_for(&AuthError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AuthError::Conflict(ConflictReason::UsernameTaken)), StatusCode::CONFLICT);
        assert_eq!(status_for(&AuthError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&AuthError::InvalidToken), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AuthError::Delivery("smtp".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let e: ApiError = AuthError::Repository("relation \"account\" does not exist".into()).into();
        assert_eq!(e.body.error, "internal");
        assert_eq!(e.body.message, "internal error");
        assert_eq!(e.body.code, 1200);
    }
}
