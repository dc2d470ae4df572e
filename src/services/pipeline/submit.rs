use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{persistence_failure, record_run, GradeJob, GradingPipeline, PipelineError};
use crate::core::time::primitive_now_utc;
use crate::repositories::submissions::CreateSubmission;
use crate::repositories::StoreError;

/// A student's answer file, already uploaded, waiting to be graded.
#[derive(Debug, Clone)]
pub(crate) struct SubmitTask {
    pub(crate) student_email: String,
    pub(crate) assessment_id: String,
    pub(crate) task_name: String,
    pub(crate) answer_file_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubmitOutcome {
    pub(crate) submission_id: String,
    pub(crate) report_url: String,
    pub(crate) results: Vec<Value>,
}

impl GradingPipeline {
    /// Grades a new submission. Every call creates exactly one submission,
    /// even when the student already submitted for this assessment.
    pub(crate) async fn submit(&self, task: SubmitTask) -> Result<SubmitOutcome, PipelineError> {
        let started = Instant::now();
        let result = self.run_submit(&task).await;
        record_run("submit", started, &result);

        match &result {
            Ok(outcome) => tracing::info!(
                kind = "submit",
                student_email = %task.student_email,
                assessment_id = %task.assessment_id,
                submission_id = %outcome.submission_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Submission graded"
            ),
            Err(err) => tracing::warn!(
                kind = "submit",
                student_email = %task.student_email,
                assessment_id = %task.assessment_id,
                error = %err,
                "Submission pipeline failed"
            ),
        }

        result
    }

    async fn run_submit(&self, task: &SubmitTask) -> Result<SubmitOutcome, PipelineError> {
        let student = self.resolve_student(&task.student_email).await?;
        let assessment = self.resolve_assessment(&task.assessment_id).await?;
        let key_url = assessment.key_file.as_deref().filter(|url| !url.is_empty()).ok_or_else(|| {
            PipelineError::InvalidAssessment {
                assessment_id: assessment.id.clone(),
                reason: "no key file uploaded".to_string(),
            }
        })?;

        let outcome = self
            .stage_and_grade(GradeJob {
                kind: "submit",
                label: format!("submit-{}", student.id),
                key_url,
                answer_url: &task.answer_file_url,
                rubric: &assessment.rubric,
                total_marks: assessment.total_marks,
                student: &student,
            })
            .await?;

        let fail = |error: StoreError| {
            persistence_failure("submit", &task.student_email, &assessment.id, &outcome, error)
        };

        let submission_id = Uuid::new_v4().to_string();
        let submission = self
            .persist(
                "create_submission",
                self.store.create_submission(CreateSubmission {
                    id: &submission_id,
                    task_name: &task.task_name,
                    assessment_id: &assessment.id,
                    student_id: &student.id,
                    submission_file: &task.answer_file_url,
                    grading_report: Some(outcome.report_url.as_str()),
                    grading_results: &outcome.results,
                    submitted_at: primitive_now_utc(),
                }),
            )
            .await
            .map_err(fail)?;

        let linked_student = self
            .persist(
                "append_student_submission",
                self.store.append_student_submission(&student.id, &submission.id),
            )
            .await
            .map_err(fail)?;
        let linked_assessment = self
            .persist(
                "append_assessment_submission",
                self.store.append_assessment_submission(&assessment.id, &submission.id),
            )
            .await
            .map_err(fail)?;

        if !(linked_student && linked_assessment) {
            tracing::warn!(
                submission_id = %submission.id,
                linked_student,
                linked_assessment,
                "Submission stored but a parent record disappeared before linking"
            );
        }

        Ok(SubmitOutcome {
            submission_id: submission.id,
            report_url: outcome.report_url,
            results: outcome.results,
        })
    }
}
