use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use super::{
    persistence_failure, record_run, EntityKind, GradeJob, GradingPipeline, PipelineError,
};
use crate::core::time::primitive_now_utc;
use crate::repositories::StoreError;

/// Regrade request raised from an appeal. `key_file_url` is the key captured
/// when the appeal was filed, not the assessment's current one.
#[derive(Debug, Clone)]
pub(crate) struct RecheckAppeal {
    pub(crate) student_email: String,
    pub(crate) key_file_url: String,
    pub(crate) assessment_id: String,
    pub(crate) appeal_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecheckOutcome {
    pub(crate) submission_id: String,
    pub(crate) report_url: String,
    pub(crate) results: Vec<Value>,
}

impl GradingPipeline {
    /// Regrades the student's latest submission in place. On any failure the
    /// stored grading fields are left as they were.
    pub(crate) async fn recheck(
        &self,
        appeal: RecheckAppeal,
    ) -> Result<RecheckOutcome, PipelineError> {
        let started = Instant::now();
        let result = self.run_recheck(&appeal).await;
        record_run("recheck", started, &result);

        let appeal_id = appeal.appeal_id.as_deref().unwrap_or("-");
        match &result {
            Ok(outcome) => tracing::info!(
                kind = "recheck",
                student_email = %appeal.student_email,
                assessment_id = %appeal.assessment_id,
                submission_id = %outcome.submission_id,
                appeal_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Appeal rechecked"
            ),
            Err(err) => tracing::warn!(
                kind = "recheck",
                student_email = %appeal.student_email,
                assessment_id = %appeal.assessment_id,
                appeal_id,
                error = %err,
                "Recheck pipeline failed"
            ),
        }

        result
    }

    async fn run_recheck(&self, appeal: &RecheckAppeal) -> Result<RecheckOutcome, PipelineError> {
        let student = self.resolve_student(&appeal.student_email).await?;
        let assessment = self.resolve_assessment(&appeal.assessment_id).await?;
        let submission = self
            .persist(
                "find_latest_submission",
                self.store.find_latest_submission(&assessment.id, &student.id),
            )
            .await
            .map_err(|source| PipelineError::Lookup { operation: "find_latest_submission", source })?
            .ok_or(PipelineError::NotFound(EntityKind::Submission))?;

        let label = match &appeal.appeal_id {
            Some(appeal_id) => format!("recheck-{appeal_id}"),
            None => format!("recheck-{}", submission.id),
        };

        let outcome = self
            .stage_and_grade(GradeJob {
                kind: "recheck",
                label,
                key_url: &appeal.key_file_url,
                answer_url: &submission.submission_file,
                rubric: &assessment.rubric,
                total_marks: assessment.total_marks,
                student: &student,
            })
            .await?;

        let fail = |error: StoreError| {
            persistence_failure("recheck", &appeal.student_email, &assessment.id, &outcome, error)
        };

        let updated = self
            .persist(
                "update_submission_grading",
                self.store.update_submission_grading(
                    &submission.id,
                    &outcome.report_url,
                    &outcome.results,
                    primitive_now_utc(),
                ),
            )
            .await
            .map_err(fail)?
            .ok_or_else(|| {
                fail(StoreError::Backend(format!("submission {} vanished", submission.id)))
            })?;

        Ok(RecheckOutcome {
            submission_id: updated.id,
            report_url: outcome.report_url,
            results: outcome.results,
        })
    }
}
