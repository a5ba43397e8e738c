//! Gateway error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the execution endpoint. Messages never include
/// token material or signing secrets.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, invalid, expired, or replayed token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token is valid but does not authorize this request
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or missing input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Standard JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            GatewayError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            GatewayError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(
            GatewayError::Unauthorized("t".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GatewayError::Forbidden("s".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            GatewayError::BadRequest("b".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Internal("i".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
