use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::policy::PasswordRule;

/// Failures surfaced by the identity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Duplicate,

    #[error("stored user record is inconsistent: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors returned by the auth service and the request authenticator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateIdentity,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Incorrect current password")]
    IncorrectCurrentPassword,

    #[error("{}", describe_rules(.0))]
    WeakPassword(Vec<PasswordRule>),

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("Could not validate credentials")]
    InvalidCredential,

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Full name must be between 1 and 255 characters")]
    InvalidFullName,

    #[error("Not authorized to modify this resource")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AuthError::DuplicateIdentity,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

fn describe_rules(rules: &[PasswordRule]) -> String {
    let parts: Vec<&str> = rules.iter().map(|r| r.message()).collect();
    parts.join("; ")
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateIdentity => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::MissingCredential
            | AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
            AuthError::WeakPassword(_) | AuthError::InvalidEmail | AuthError::InvalidFullName => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::InvalidOrExpiredToken | AuthError::IncorrectCurrentPassword => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Internal(detail) => {
                error!(error = %detail, "internal auth error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "error": message }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
