use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Teacher;
use crate::schemas::assessment::FolderResponse;
use crate::schemas::class::ClassResponse;

pub(crate) const DEFAULT_ROLE: &str = "teacher";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeacherCreate {
    #[serde(alias = "identity_id", alias = "clerkUserId")]
    #[validate(length(min = 1, message = "identityId must not be empty"))]
    pub(crate) identity_id: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(default, alias = "first_name")]
    pub(crate) first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 32, message = "role must not be empty"))]
    pub(crate) role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssignClassRequest {
    #[serde(alias = "teacher_email")]
    #[validate(email(message = "teacherEmail must be a valid address"))]
    pub(crate) teacher_email: String,
    #[serde(alias = "class_id")]
    #[validate(length(min = 1, message = "classId must not be empty"))]
    pub(crate) class_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeacherResponse {
    pub(crate) id: String,
    pub(crate) identity_id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) role: String,
    pub(crate) classes: Vec<String>,
    pub(crate) created_at: String,
}

impl TeacherResponse {
    pub(crate) fn from_db(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            identity_id: teacher.identity_id,
            email: teacher.email,
            first_name: teacher.first_name,
            last_name: teacher.last_name,
            role: teacher.role,
            classes: teacher.class_ids,
            created_at: format_primitive(teacher.created_at),
        }
    }
}

/// A taught class with its assessments inlined.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaughtClass {
    #[serde(flatten)]
    pub(crate) class: ClassResponse,
    pub(crate) folders: Vec<FolderResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TeacherDetailsResponse {
    pub(crate) name: String,
    pub(crate) role: String,
    pub(crate) email: String,
    pub(crate) classes: Vec<TaughtClass>,
}
