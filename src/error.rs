use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::middleware::onboarding::ONBOARDING_THRESHOLD;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database not available")]
    DatabaseUnavailable,

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Request URLs are stripped on conversion; they carry the API key
    #[error("HTTP client error: {0}")]
    HttpClient(reqwest::Error),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Onboarding incomplete, {remaining} ratings remaining")]
    OnboardingIncomplete { remaining: i64 },

    #[error("Onboarding check failed")]
    OnboardingCheckFailed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::HttpClient(e.without_url())
    }
}

impl AppError {
    /// True when PostgreSQL aborted the transaction to break a deadlock
    pub fn is_deadlock(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db)) => db.code().as_deref() == Some("40P01"),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AppError::OnboardingIncomplete { remaining } => {
                let body = Json(json!({
                    "success": false,
                    "error": format!(
                        "Onboarding incomplete. Please rate at least {} movies.",
                        ONBOARDING_THRESHOLD
                    ),
                    "remaining": remaining,
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DatabaseUnavailable => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::OnboardingCheckFailed => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::HttpClient(_) => {
                tracing::error!(error = %self, "Upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream metadata service unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthorized("missing".into()), StatusCode::UNAUTHORIZED),
            (AppError::OnboardingIncomplete { remaining: 3 }, StatusCode::FORBIDDEN),
            (AppError::OnboardingCheckFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::DatabaseUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::ExternalApi("down".into()), StatusCode::BAD_GATEWAY),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_non_database_error_is_not_deadlock() {
        assert!(!AppError::DatabaseUnavailable.is_deadlock());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_deadlock());
    }
}
