use std::fmt;

use models::account::{EMAIL_INDEX, USERNAME_INDEX};
use models::errors::ModelError;
use thiserror::Error;

/// Which uniqueness or state rule a conflicting request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    EmailTaken,
    UsernameTaken,
    AlreadyVerified,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictReason::EmailTaken => "email already in use",
            ConflictReason::UsernameTaken => "username already taken",
            ConflictReason::AlreadyVerified => "email already verified",
        })
    }
}

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(ConflictReason),
    #[error("account not found")]
    NotFound,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("email not verified")]
    Forbidden,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error("delivery error: {0}")]
    Delivery(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict(_) => 1002,
            AuthError::NotFound => 1003,
            AuthError::Unauthorized => 1004,
            AuthError::Forbidden => 1005,
            AuthError::InvalidToken => 1006,
            AuthError::Hash(_) => 1101,
            AuthError::Token(_) => 1102,
            AuthError::Delivery(_) => 1103,
            AuthError::Repository(_) => 1200,
        }
    }

    /// Short machine-readable category used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "validation",
            AuthError::Conflict(_) => "conflict",
            AuthError::NotFound => "not_found",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Forbidden => "forbidden",
            AuthError::InvalidToken => "invalid_token",
            _ => "internal",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Hash(_) | AuthError::Token(_) | AuthError::Repository(_) | AuthError::Delivery(_)
        )
    }

    /// Message safe to show a caller. Internal failures never leak their detail.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "internal error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<ModelError> for AuthError {
    fn from(e: ModelError) -> Self {
        if e.violates(EMAIL_INDEX) {
            return AuthError::Conflict(ConflictReason::EmailTaken);
        }
        if e.violates(USERNAME_INDEX) {
            return AuthError::Conflict(ConflictReason::UsernameTaken);
        }
        match e {
            ModelError::Validation(msg) => AuthError::Validation(msg),
            other => AuthError::Repository(other.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(e: sea_orm::DbErr) -> Self {
        ModelError::from(e).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_map_to_conflict_reasons() {
        let e: AuthError = ModelError::Conflict(format!("duplicate key value violates unique constraint \"{EMAIL_INDEX}\"")).into();
        assert!(matches!(e, AuthError::Conflict(ConflictReason::EmailTaken)));
        let e: AuthError = ModelError::Conflict(format!("violates \"{USERNAME_INDEX}\"")).into();
        assert!(matches!(e, AuthError::Conflict(ConflictReason::UsernameTaken)));
        let e: AuthError = ModelError::Db("connection reset".into()).into();
        assert!(matches!(e, AuthError::Repository(_)));
    }

    #[test]
    fn internal_errors_hide_details() {
        let e = AuthError::Repository("password=secret host=db".into());
        assert_eq!(e.kind(), "internal");
        assert_eq!(e.public_message(), "internal error");
        assert_eq!(AuthError::Conflict(ConflictReason::EmailTaken).public_message(), "email already in use");
        assert_eq!(AuthError::InvalidToken.code(), 1006);
    }
}
