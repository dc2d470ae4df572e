use std::fmt;

use thiserror::Error;

use crate::repositories::StoreError;
use crate::services::grading_engine::{EngineError, EngineFailure};
use crate::services::staging::StagingError;
use crate::services::storage::BlobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntityKind {
    Student,
    Assessment,
    Submission,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Student => "Student",
            Self::Assessment => "Assessment",
            Self::Submission => "Submission",
        })
    }
}

#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error("{0} not found")]
    NotFound(EntityKind),
    #[error("assessment {assessment_id} cannot be graded: {reason}")]
    InvalidAssessment { assessment_id: String, reason: String },
    #[error("failed to fetch {url}: {source}")]
    UpstreamFetch {
        url: String,
        #[source]
        source: BlobError,
    },
    #[error("grading failed: {0}")]
    GradingEngine(EngineFailure),
    #[error("{0}")]
    UnsupportedOperation(String),
    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),
    /// A store read failed before anything was graded.
    #[error("{operation} failed: {source}")]
    Lookup {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
    /// Raised only after grading succeeded; `report_url` is the result that
    /// could not be stored. The full results go to the error log.
    #[error("failed to persist grading result: {message}")]
    Persistence { message: String, report_url: String },
}

impl From<EngineError> for PipelineError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Unsupported { .. } => Self::UnsupportedOperation(error.to_string()),
            EngineError::Failed(failure) => Self::GradingEngine(failure),
        }
    }
}

impl PipelineError {
    /// Metric label for the run outcome.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidAssessment { .. } => "invalid_assessment",
            Self::UpstreamFetch { .. } => "upstream_fetch_error",
            Self::GradingEngine(_) => "grading_engine_error",
            Self::UnsupportedOperation(_) => "unsupported",
            Self::Staging(_) => "staging_error",
            Self::Lookup { .. } => "store_error",
            Self::Persistence { .. } => "persistence_error",
        }
    }
}
