use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Student;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentCreate {
    #[serde(alias = "identity_id", alias = "clerkId")]
    #[validate(length(min = 1, message = "identityId must not be empty"))]
    pub(crate) identity_id: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(default, alias = "first_name")]
    pub(crate) first_name: Option<String>,
    #[serde(default, alias = "last_name")]
    pub(crate) last_name: Option<String>,
}

/// Body of both enrolment and removal.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ClassMembershipRequest {
    #[serde(alias = "student_email")]
    #[validate(email(message = "studentEmail must be a valid address"))]
    pub(crate) student_email: String,
    #[serde(alias = "class_id")]
    #[validate(length(min = 1, message = "classId must not be empty"))]
    pub(crate) class_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentEmailQuery {
    #[serde(alias = "student_email")]
    pub(crate) student_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) identity_id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) enrolled_classes: Vec<String>,
    pub(crate) submissions: Vec<String>,
    pub(crate) created_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            identity_id: student.identity_id,
            email: student.email,
            first_name: student.first_name,
            last_name: student.last_name,
            enrolled_classes: student.enrolled_class_ids,
            submissions: student.submission_ids,
            created_at: format_primitive(student.created_at),
        }
    }
}
