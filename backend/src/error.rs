//! Application error handling
//!
//! This module provides unified error handling for the API,
//! converting internal errors to appropriate HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use helix_shared::errors::FieldError;
use helix_shared::types::{ErrorDetail, ErrorResponse};
use helix_shared::PlanStatus;
use thiserror::Error;
use tracing::error;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input")]
    InvalidFields(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Package not found")]
    PackageNotFound,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("An active subscription is required")]
    SubscriptionRequired,

    #[error("Subscription expired")]
    SubscriptionExpired,

    #[error("An open plan request already exists")]
    OpenRequestExists,

    #[error("Only today's tasks can be changed")]
    ImmutableHistoricalTask,

    #[error("No draft to publish")]
    DraftNotFound,

    #[error("Cannot {action} a request in status {from}")]
    InvalidTransition { from: PlanStatus, action: &'static str },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) | ApiError::InvalidFields(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::PackageNotFound => (StatusCode::NOT_FOUND, "PACKAGE_NOT_FOUND"),
            ApiError::DuplicateEmail => (StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
            ApiError::SubscriptionRequired => (StatusCode::CONFLICT, "SUBSCRIPTION_REQUIRED"),
            ApiError::SubscriptionExpired => (StatusCode::CONFLICT, "SUBSCRIPTION_EXPIRED"),
            ApiError::OpenRequestExists => (StatusCode::CONFLICT, "OPEN_REQUEST_EXISTS"),
            ApiError::ImmutableHistoricalTask => {
                (StatusCode::CONFLICT, "IMMUTABLE_HISTORICAL_TASK")
            }
            ApiError::DraftNotFound => (StatusCode::CONFLICT, "DRAFT_NOT_FOUND"),
            ApiError::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Build the response body; internal details are logged, never returned
    pub fn detail(&self) -> ErrorDetail {
        let (_, code) = self.status_and_code();
        let message = match self {
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let fields = match self {
            ApiError::InvalidFields(fields) => Some(fields.clone()),
            _ => None,
        };
        let field = fields
            .as_ref()
            .and_then(|f| f.first())
            .map(|f| f.field.clone());

        ErrorDetail {
            code: code.to_string(),
            message,
            field,
            fields,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::InvalidFields(helix_shared::validation::field_errors(&errors))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, _) = self.status_and_code();
        let body = Json(ErrorResponse {
            error: self.detail(),
        });
        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::Validation("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Forbidden("admins only".into()), StatusCode::FORBIDDEN)]
    #[case(ApiError::NotFound("user".into()), StatusCode::NOT_FOUND)]
    #[case(ApiError::DuplicateEmail, StatusCode::CONFLICT)]
    #[case(ApiError::SubscriptionExpired, StatusCode::CONFLICT)]
    #[case(ApiError::ImmutableHistoricalTask, StatusCode::CONFLICT)]
    #[case(ApiError::DraftNotFound, StatusCode::CONFLICT)]
    #[case(ApiError::BadRequest("malformed event".into()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::OpenRequestExists, StatusCode::CONFLICT)]
    fn test_error_status(#[case] error: ApiError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn test_unauthorized_and_forbidden_are_distinct() {
        let (a, code_a) = ApiError::Unauthorized("x".into()).status_and_code();
        let (b, code_b) = ApiError::Forbidden("x".into()).status_and_code();
        assert_ne!(a, b);
        assert_ne!(code_a, code_b);
    }

    #[test]
    fn test_field_errors_are_reported() {
        let error = ApiError::InvalidFields(vec![
            FieldError::new("goals", "Please describe your goals"),
            FieldError::new("age", "Age must be between 1 and 120"),
        ]);
        let detail = error.detail();
        assert_eq!(detail.code, "VALIDATION_ERROR");
        assert_eq!(detail.field.as_deref(), Some("goals"));
        assert_eq!(detail.fields.unwrap().len(), 2);
    }

    #[test]
    fn test_internal_error_hides_details() {
        let detail = ApiError::Internal(anyhow::anyhow!("connection refused")).detail();
        assert_eq!(detail.message, "An internal error occurred");
    }

    #[test]
    fn test_transition_message() {
        let error = ApiError::InvalidTransition {
            from: PlanStatus::Requested,
            action: "submit a draft for",
        };
        assert_eq!(error.to_string(), "Cannot submit a draft for a request in status REQUESTED");
    }
}
