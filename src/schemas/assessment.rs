use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Assessment;
use crate::schemas::rubric::Rubric;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FolderResponse {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) question_file: Option<String>,
    pub(crate) key_file: Option<String>,
    pub(crate) due_date: Option<String>,
    pub(crate) rubric: Rubric,
    pub(crate) total_marks: f64,
    pub(crate) submissions: Vec<String>,
    pub(crate) created_at: String,
}

impl FolderResponse {
    pub(crate) fn from_db(assessment: Assessment) -> Self {
        Self {
            id: assessment.id,
            class_id: assessment.class_id,
            name: assessment.name,
            description: assessment.description,
            question_file: assessment.question_file,
            key_file: assessment.key_file,
            due_date: assessment.due_date.map(format_primitive),
            rubric: assessment.rubric.0,
            total_marks: assessment.total_marks,
            submissions: assessment.submission_ids,
            created_at: format_primitive(assessment.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateExcelRequest {
    #[serde(alias = "folder_id", alias = "assessmentId")]
    #[validate(length(min = 1, message = "folderId must not be empty"))]
    pub(crate) folder_id: String,
}
