// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Schema validation failure for one document
///
/// Recoverable: reported inside a batch's `errors` list while sibling
/// documents carry on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: String,
    pub id: Option<String>,
    pub message: String,
    pub errors: HashMap<String, String>,
}

impl ValidationError {
    pub fn new(kind: &str, id: Option<&str>, errors: HashMap<String, String>) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.map(str::to_string),
            message: format!("{} validation failed", kind),
            errors,
        }
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<crate::database::StoreError> for ApiError {
    fn from(err: crate::database::StoreError) -> Self {
        match err {
            crate::database::StoreError::ConnectionError(_) | crate::database::StoreError::ConfigMissing(_) => {
                tracing::error!("Store unavailable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Don't expose storage internals to clients
                tracing::error!("Store error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<crate::crud::CrudError> for ApiError {
    fn from(err: crate::crud::CrudError) -> Self {
        use crate::crud::CrudError;
        match err {
            CrudError::Input(msg) => ApiError::bad_request(msg),
            CrudError::Json(e) => ApiError::invalid_json(e.to_string()),
            CrudError::Filter(e) => ApiError::bad_request(e.to_string()),
            CrudError::NotFound(msg) => ApiError::not_found(msg),
            CrudError::Configuration(e) => {
                tracing::error!("Resource configuration error: {}", e);
                ApiError::internal_server_error(e.to_string())
            }
            CrudError::Persistence(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::CrudError;
    use crate::projection::ConfigurationError;

    #[test]
    fn crud_errors_map_to_statuses() {
        let input: ApiError = CrudError::Input("no models".into()).into();
        assert_eq!(input.status_code(), 400);
        assert_eq!(input.error_code(), "BAD_REQUEST");

        let missing: ApiError = CrudError::NotFound("gone".into()).into();
        assert_eq!(missing.status_code(), 404);

        let config: ApiError = CrudError::Configuration(ConfigurationError::NoEditableFields).into();
        assert_eq!(config.status_code(), 500);
    }

    #[test]
    fn store_errors_hide_details() {
        let err: ApiError = crate::database::StoreError::Backend("relation missing".into()).into();
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("relation"));
    }

    #[test]
    fn json_body_shape() {
        let body = ApiError::not_found("nope").to_json();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "nope");
    }
}
