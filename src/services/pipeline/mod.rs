//! Grading pipelines: stage the key and answer files, call the grading engine,
//! persist the result. Staged files never outlive one invocation.

mod error;
mod recheck;
mod submit;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::db::models::{Assessment, Student};
use crate::repositories::{Store, StoreError};
use crate::schemas::rubric::{check_marks_within_bounds, Rubric};
use crate::services::grading_engine::{
    EngineFailure, EngineFile, GradeAnswerRequest, GradingEngineClient, GradingOutcome,
};
use crate::services::staging::{StagedBatch, StagingArea};
use crate::services::storage::{BlobError, BlobStore};

pub(crate) use error::{EntityKind, PipelineError};
pub(crate) use recheck::{RecheckAppeal, RecheckOutcome};
pub(crate) use submit::{SubmitOutcome, SubmitTask};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineLimits {
    pub(crate) blob_fetch_timeout: Duration,
    pub(crate) persistence_timeout: Duration,
    pub(crate) validate_marks: bool,
}

impl PipelineLimits {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            blob_fetch_timeout: Duration::from_secs(settings.storage().blob_fetch_timeout_seconds),
            persistence_timeout: Duration::from_secs(
                settings.storage().persistence_timeout_seconds,
            ),
            validate_marks: settings.grading().validate_marks,
        }
    }
}

#[derive(Clone)]
pub(crate) struct GradingPipeline {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    engine: GradingEngineClient,
    staging: StagingArea,
    limits: PipelineLimits,
}

/// Inputs for one grading call, after the entities are resolved.
struct GradeJob<'a> {
    kind: &'static str,
    label: String,
    key_url: &'a str,
    answer_url: &'a str,
    rubric: &'a Rubric,
    total_marks: f64,
    student: &'a Student,
}

impl GradingPipeline {
    pub(crate) fn new(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        engine: GradingEngineClient,
        staging: StagingArea,
        limits: PipelineLimits,
    ) -> Self {
        Self { store, blobs, engine, staging, limits }
    }

    pub(crate) fn staging(&self) -> &StagingArea {
        &self.staging
    }

    async fn resolve_student(&self, email: &str) -> Result<Student, PipelineError> {
        self.persist("find_student_by_email", self.store.find_student_by_email(email))
            .await
            .map_err(|source| PipelineError::Lookup { operation: "find_student_by_email", source })?
            .ok_or(PipelineError::NotFound(EntityKind::Student))
    }

    async fn resolve_assessment(&self, id: &str) -> Result<Assessment, PipelineError> {
        let assessment = self
            .persist("find_assessment", self.store.find_assessment(id))
            .await
            .map_err(|source| PipelineError::Lookup { operation: "find_assessment", source })?
            .ok_or(PipelineError::NotFound(EntityKind::Assessment))?;

        let invalid = |reason: &str| PipelineError::InvalidAssessment {
            assessment_id: assessment.id.clone(),
            reason: reason.to_string(),
        };
        if assessment.rubric.questions.is_empty() {
            return Err(invalid("rubric has no questions"));
        }
        if !assessment.total_marks.is_finite() || assessment.total_marks <= 0.0 {
            return Err(invalid("totalMarks must be positive"));
        }

        Ok(assessment)
    }

    /// Stages both files in a fresh batch, grades them and releases the batch
    /// whatever the outcome.
    async fn stage_and_grade(&self, job: GradeJob<'_>) -> Result<GradingOutcome, PipelineError> {
        let mut batch = self.staging.begin(&job.label).await?;
        let result = self.fetch_and_grade(&batch, &job).await;
        batch.cleanup().await;
        result
    }

    async fn fetch_and_grade(
        &self,
        batch: &StagedBatch,
        job: &GradeJob<'_>,
    ) -> Result<GradingOutcome, PipelineError> {
        let (key_bytes, answer_bytes) =
            tokio::try_join!(self.fetch(job.key_url), self.fetch(job.answer_url))?;

        let key = batch.stage(&staged_name("key", job.key_url), &key_bytes).await?;
        let answer = batch.stage(&staged_name("answer", job.answer_url), &answer_bytes).await?;
        drop((key_bytes, answer_bytes));

        tracing::debug!(
            kind = job.kind,
            dir = %batch.dir().display(),
            key_bytes = key.size,
            answer_bytes = answer.size,
            "Staged grading inputs"
        );

        let student_name = job.student.display_name();
        let request = GradeAnswerRequest {
            key: EngineFile { bytes: batch.read(&key).await?, file_name: key.file_name },
            answer: EngineFile { bytes: batch.read(&answer).await?, file_name: answer.file_name },
            rubric: job.rubric,
            total_marks: job.total_marks,
            student_name: &student_name,
            student_email: &job.student.email,
        };

        let outcome = self.engine.grade_answer(request).await?;

        if self.limits.validate_marks {
            if let Err(reason) = check_marks_within_bounds(job.rubric, &outcome.results) {
                return Err(PipelineError::GradingEngine(EngineFailure {
                    message: format!("grading engine returned out-of-range marks: {reason}"),
                    upstream_status: None,
                    upstream_body: Some(json!({
                        "pdf_url": outcome.report_url,
                        "results": outcome.results,
                    })),
                }));
            }
        }

        Ok(outcome)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let upstream = |source| PipelineError::UpstreamFetch { url: url.to_string(), source };

        match tokio::time::timeout(self.limits.blob_fetch_timeout, self.blobs.download(url)).await {
            Ok(result) => result.map_err(upstream),
            Err(_) => Err(upstream(BlobError::Timeout(url.to_string()))),
        }
    }

    async fn persist<T, F>(&self, operation: &'static str, write: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.limits.persistence_timeout, write).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Backend(format!("{operation} timed out"))),
        }
    }
}

/// Logs the grading result in full so it can be recovered by hand, then
/// turns the store failure into a pipeline error.
fn persistence_failure(
    kind: &'static str,
    student_email: &str,
    assessment_id: &str,
    outcome: &GradingOutcome,
    error: StoreError,
) -> PipelineError {
    tracing::error!(
        kind,
        student_email,
        assessment_id,
        report_url = %outcome.report_url,
        grading_results = ?outcome.results,
        error = %error,
        "Grading succeeded but the result could not be persisted"
    );

    PipelineError::Persistence { message: error.to_string(), report_url: outcome.report_url.clone() }
}

fn record_run<T>(kind: &'static str, started: Instant, result: &Result<T, PipelineError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(err) => err.outcome(),
    };
    metrics::record_pipeline_run(kind, outcome, started.elapsed());
}

/// `{prefix}-{last url segment}`, keeping the extension the engine sniffs.
fn staged_name(prefix: &str, url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next().filter(|segment| !segment.is_empty()) {
        Some(segment) => format!("{prefix}-{segment}"),
        None => format!("{prefix}.pdf"),
    }
}
