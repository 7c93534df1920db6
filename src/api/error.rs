//! API Error Taxonomy
//! Mission: Translate every handler failure into the JSON response envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors surfaced by any handler; each maps to a status code and the
/// `{success: false, message | errors}` envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input fields; carries one message per field
    Validation(Vec<String>),
    /// Registration against an email that is already taken
    DuplicateEmail,
    /// Login failed; unknown email and bad password are indistinguishable
    InvalidCredentials,
    /// No identity resolved for a protected route
    Unauthenticated(&'static str),
    /// Identity resolved but role not permitted
    Forbidden(String),
    NotFound(String),
    /// Rejected request that is well-formed but not permitted (e.g. admin
    /// self-deletion)
    BadRequest(String),
    /// Loan status precondition failed; message names the current status
    InvalidTransition(String),
    /// Catch-all; logged, never echoed to the client
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "errors": errors }),
            ),
            ApiError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": "User already exists" }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": "Invalid credentials" }),
            ),
            ApiError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::BadRequest(msg) | ApiError::InvalidTransition(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": msg }),
            ),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": "Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (
                ApiError::Validation(vec!["Name is required".to_string()]),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::DuplicateEmail, StatusCode::BAD_REQUEST),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                ApiError::Unauthenticated("Not authorized, no token"),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Forbidden("nope".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::NotFound("Loan not found".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::InvalidTransition("Loan is already approved".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = anyhow::anyhow!("db exploded");
        let api_err: ApiError = err.into();
        assert!(matches!(api_err, ApiError::Internal(_)));
    }
}
