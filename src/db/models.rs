use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::schemas::rubric::Rubric;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Class {
    pub(crate) id: String,
    pub(crate) class_code: String,
    pub(crate) class_name: String,
    pub(crate) capacity: i32,
    pub(crate) student_ids: Vec<String>,
    pub(crate) assessment_ids: Vec<String>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) identity_id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) enrolled_class_ids: Vec<String>,
    pub(crate) submission_ids: Vec<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

fn full_name(first: Option<&str>, last: Option<&str>, email: &str) -> String {
    let name = format!(
        "{} {}",
        first.unwrap_or_default().trim(),
        last.unwrap_or_default().trim()
    );
    let name = name.trim();
    if name.is_empty() {
        email.to_string()
    } else {
        name.to_string()
    }
}

impl Student {
    /// Name sent to the grading engine; falls back to the email.
    pub(crate) fn display_name(&self) -> String {
        full_name(self.first_name.as_deref(), self.last_name.as_deref(), &self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) identity_id: String,
    pub(crate) email: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) role: String,
    pub(crate) class_ids: Vec<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

impl Teacher {
    pub(crate) fn display_name(&self) -> String {
        full_name(self.first_name.as_deref(), self.last_name.as_deref(), &self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assessment {
    pub(crate) id: String,
    pub(crate) class_id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) question_file: Option<String>,
    pub(crate) key_file: Option<String>,
    pub(crate) due_date: Option<PrimitiveDateTime>,
    pub(crate) rubric: Json<Rubric>,
    pub(crate) total_marks: f64,
    pub(crate) submission_ids: Vec<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) task_name: String,
    pub(crate) assessment_id: String,
    pub(crate) student_id: String,
    pub(crate) submission_file: String,
    pub(crate) grading_report: Option<String>,
    pub(crate) grading_results: Json<Vec<Value>>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Appeal {
    pub(crate) id: String,
    pub(crate) grading_report: String,
    pub(crate) student_email: String,
    pub(crate) assessment_id: String,
    pub(crate) key_file: String,
    pub(crate) description: String,
    pub(crate) created_at: PrimitiveDateTime,
}
