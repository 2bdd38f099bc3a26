pub mod health;
pub mod laws;
pub mod metrics;

// Common response types
use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::DatabaseError;
use serde::Serialize;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> StatusCode {
        match self.error.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DatabaseError> for ErrorResponse {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(message) => Self::not_found(message),
            other => {
                tracing::error!(error = %other, "Database error");
                Self::new("database_error", "Failed to query laws")
            }
        }
    }
}

impl From<QueryRejection> for ErrorResponse {
    fn from(rejection: QueryRejection) -> Self {
        Self::new("validation_error", rejection.body_text())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ErrorResponse::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorResponse::new("validation_error", "x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorResponse::from(DatabaseError::QueryFailed("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_details_are_optional() {
        let plain = serde_json::to_value(ErrorResponse::not_found("missing")).unwrap();
        assert!(plain.get("details").is_none());

        let detailed = ErrorResponse::not_found("missing").with_details(serde_json::json!({"slug": "bgb"}));
        let value = serde_json::to_value(detailed).unwrap();
        assert_eq!(value["details"]["slug"], "bgb");
    }
}
