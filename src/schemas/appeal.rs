use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Appeal;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppealCreate {
    #[serde(alias = "grading_report")]
    #[validate(length(min = 1, message = "gradingReport must not be empty"))]
    pub(crate) grading_report: String,
    #[serde(alias = "student_email")]
    #[validate(email(message = "studentEmail must be a valid address"))]
    pub(crate) student_email: String,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecheckRequest {
    #[serde(alias = "student_email")]
    #[validate(email(message = "studentEmail must be a valid address"))]
    pub(crate) student_email: String,
    #[serde(alias = "key_file", alias = "keyFileUrl")]
    #[validate(length(min = 1, message = "keyFile must not be empty"))]
    pub(crate) key_file: String,
    #[serde(alias = "assessment_id")]
    #[validate(length(min = 1, message = "assessmentId must not be empty"))]
    pub(crate) assessment_id: String,
    #[serde(default, alias = "appeal_id")]
    pub(crate) appeal_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppealResponse {
    pub(crate) id: String,
    pub(crate) grading_report: String,
    pub(crate) student_email: String,
    pub(crate) assessment_id: String,
    pub(crate) key_file: String,
    pub(crate) description: String,
    pub(crate) created_at: String,
}

impl AppealResponse {
    pub(crate) fn from_db(appeal: Appeal) -> Self {
        Self {
            id: appeal.id,
            grading_report: appeal.grading_report,
            student_email: appeal.student_email,
            assessment_id: appeal.assessment_id,
            key_file: appeal.key_file,
            description: appeal.description,
            created_at: format_primitive(appeal.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecheckResponse {
    pub(crate) message: &'static str,
    pub(crate) submission_id: String,
    pub(crate) new_grading_report_url: String,
    pub(crate) grading_results: Vec<serde_json::Value>,
}
