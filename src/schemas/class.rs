use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Class;
use crate::schemas::assessment::FolderResponse;
use crate::schemas::student::StudentResponse;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassCreate {
    #[serde(alias = "class_code")]
    #[validate(length(min = 1, max = 64, message = "classCode must not be empty"))]
    pub(crate) class_code: String,
    #[serde(alias = "class_name")]
    #[validate(length(min = 1, message = "className must not be empty"))]
    pub(crate) class_name: String,
    #[validate(range(min = 1, message = "capacity must be positive"))]
    pub(crate) capacity: i32,
    #[serde(default, alias = "teacher_email")]
    #[validate(email(message = "teacherEmail must be a valid address"))]
    pub(crate) teacher_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassResponse {
    pub(crate) id: String,
    pub(crate) class_code: String,
    pub(crate) class_name: String,
    pub(crate) capacity: i32,
    pub(crate) students: Vec<String>,
    pub(crate) assessments: Vec<String>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) created_at: String,
}

impl ClassResponse {
    pub(crate) fn from_db(class: Class) -> Self {
        Self {
            id: class.id,
            class_code: class.class_code,
            class_name: class.class_name,
            capacity: class.capacity,
            students: class.student_ids,
            assessments: class.assessment_ids,
            teacher_id: class.teacher_id,
            created_at: format_primitive(class.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassRosterResponse {
    pub(crate) class_name: String,
    pub(crate) students: Vec<StudentResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassFoldersResponse {
    pub(crate) class_name: String,
    pub(crate) folders: Vec<FolderResponse>,
}
