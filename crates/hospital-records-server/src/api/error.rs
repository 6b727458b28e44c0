//! HTTP error mapping.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hospital_records_core::RecordError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by the patient endpoints. Every variant renders as a JSON
/// body with an `error` key.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Patient not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::NotFound(_) => ApiError::NotFound,
            RecordError::Validation(_) | RecordError::Constraint(_) => {
                ApiError::BadRequest(e.to_string())
            }
            RecordError::Database(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid data format: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!("Invalid patient id: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_records_core::ValidationError;

    #[test]
    fn test_record_error_mapping() {
        assert_eq!(
            ApiError::from(RecordError::NotFound(1)).status(),
            StatusCode::NOT_FOUND
        );

        let missing = ApiError::from(RecordError::Validation(ValidationError::MissingField(
            "name".into(),
        )));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "Missing key: 'name'");

        let duplicate = ApiError::from(RecordError::Constraint("UNIQUE".into()));
        assert_eq!(duplicate.to_string(), "Integrity error, possibly duplicate entry");

        let internal = ApiError::from(RecordError::Database("disk I/O error".into()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
