use serde::Serialize;
use serde_json::Value;

use crate::core::time::format_primitive;
use crate::db::models::Submission;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) task_name: String,
    pub(crate) assessment_id: String,
    pub(crate) student_id: String,
    pub(crate) submission_file: String,
    pub(crate) grading_report: Option<String>,
    pub(crate) grading_results: Vec<Value>,
    pub(crate) submitted_at: String,
    pub(crate) updated_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            task_name: submission.task_name,
            assessment_id: submission.assessment_id,
            student_id: submission.student_id,
            submission_file: submission.submission_file,
            grading_report: submission.grading_report,
            grading_results: submission.grading_results.0,
            submitted_at: format_primitive(submission.submitted_at),
            updated_at: format_primitive(submission.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitTaskResponse {
    pub(crate) message: &'static str,
    pub(crate) submission_id: String,
    pub(crate) grading_report_url: String,
    pub(crate) grading_results: Vec<Value>,
}
