use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use storymetrics_core::ReportError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        field: Option<&'static str>,
    },

    #[error("report failed: {0}")]
    Report(#[from] ReportError),
}

impl AppError {
    pub fn bad_field(field: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            field: Some(field),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::BadRequest { message, field } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message.clone(),
                *field,
            ),
            AppError::Report(ReportError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::Report(ReportError::Remote { status, message }) => {
                tracing::warn!(remote_status = status, %message, "Reporting service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "reporting_service_error",
                    message.clone(),
                    None,
                )
            }
            AppError::Report(e @ (ReportError::Transport(_) | ReportError::Malformed(_))) => {
                tracing::error!(error = %e, "Analytics backend failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "analytics_backend_error",
                    "Analytics backend unavailable".to_string(),
                    None,
                )
            }
            AppError::Report(e @ ReportError::Serialization(_)) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field
                }
            })),
        )
            .into_response()
    }
}
