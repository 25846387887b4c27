use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::access::AccessDenied;
use crate::repo::StoreError;
use crate::validation::{FieldError, Violations, ALREADY_USED};

/// Every outcome a handler can surface besides success.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Body that is not JSON or does not fit the payload type.
    #[error("{1}")]
    Payload(StatusCode, String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.property_path, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Payload(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(kind: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{kind} {id} not found"))
    }
}

impl From<Violations> for ApiError {
    fn from(v: Violations) -> Self {
        ApiError::Validation(v.into_errors())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Payload(rejection.status(), rejection.body_text())
    }
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        if denied.authenticated {
            ApiError::Forbidden(denied.reason)
        } else {
            ApiError::Unauthorized(denied.reason)
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(field) => ApiError::Validation(vec![FieldError::new(field, ALREADY_USED)]),
            StoreError::Database(e) => ApiError::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({
                "title": "An error occurred",
                "detail": self.to_string(),
                "violations": errors,
            }),
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                json!({ "title": "An error occurred", "detail": "Internal Server Error" })
            }
            other => json!({ "title": "An error occurred", "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
