use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::repositories::StoreError;
use crate::services::pipeline::PipelineError;
use crate::services::storage::BlobError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream: Option<Value>,
    #[serde(rename = "gradingReportUrl", skip_serializing_if = "Option::is_none")]
    grading_report_url: Option<String>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    /// Grading engine or blob store failure; `upstream` carries the engine's
    /// status and body when it answered at all.
    BadGateway { detail: String, upstream: Option<Value> },
    ServiceUnavailable(String),
    /// Grading succeeded but storing it failed; the report URL is handed back.
    Persistence { detail: String, grading_report_url: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    pub(crate) fn store(err: StoreError, context: &str) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                tracing::debug!(%constraint, "Unique constraint violated");
                Self::Conflict(format!("{context}: record already exists"))
            }
            other => Self::internal(other, context),
        }
    }

    pub(crate) fn blob(err: BlobError, context: &str) -> Self {
        match err {
            BlobError::NotConfigured => {
                Self::ServiceUnavailable("Object storage is not configured".to_string())
            }
            other => {
                tracing::warn!(error = %other, "{context}");
                Self::BadGateway { detail: format!("{context}: {other}"), upstream: None }
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotFound(kind) => Self::NotFound(format!("{kind} not found")),
            PipelineError::InvalidAssessment { .. } => Self::Unprocessable(err.to_string()),
            PipelineError::UpstreamFetch { .. } => {
                Self::BadGateway { detail: err.to_string(), upstream: None }
            }
            PipelineError::GradingEngine(failure) => {
                let upstream = (failure.upstream_status.is_some() || failure.upstream_body.is_some())
                    .then(|| json!({"status": failure.upstream_status, "body": failure.upstream_body}));
                Self::BadGateway { detail: format!("Grading failed: {}", failure.message), upstream }
            }
            PipelineError::UnsupportedOperation(message) => Self::BadRequest(message),
            PipelineError::Staging(source) => Self::internal(source, "Failed to stage grading files"),
            PipelineError::Lookup { operation, source } => {
                tracing::error!(operation, error = %source, "Store lookup failed before grading");
                Self::Internal("Failed to load grading records".to_string())
            }
            PipelineError::Persistence { message, report_url } => {
                tracing::error!(error = %message, "Failed to persist grading result");
                Self::Persistence {
                    detail: "Grading completed but the result could not be saved".to_string(),
                    grading_report_url: report_url,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, upstream, grading_report_url) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None, None),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, None, None),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, None, None),
            ApiError::Unprocessable(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, None, None)
            }
            ApiError::BadGateway { detail, upstream } => {
                (StatusCode::BAD_GATEWAY, detail, upstream, None)
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, message, None, None)
            }
            ApiError::Persistence { detail, grading_report_url } => {
                (StatusCode::INTERNAL_SERVER_ERROR, detail, None, Some(grading_report_url))
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message, None, None)
            }
        };

        let body = ErrorResponse { status: status.as_u16(), detail, upstream, grading_report_url };
        (status, Json(body)).into_response()
    }
}
