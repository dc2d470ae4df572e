use serde_json::Value;
use thiserror::Error;

use crate::db::models::{Appeal, Assessment, Class, Student, Submission, Teacher};
use crate::repositories::appeals::CreateAppeal;
use crate::repositories::assessments::CreateAssessment;
use crate::repositories::classes::CreateClass;
use crate::repositories::students::CreateStudent;
use crate::repositories::submissions::CreateSubmission;
use crate::repositories::teachers::CreateTeacher;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                let constraint = db_error.constraint().unwrap_or("unique constraint");
                return Self::Conflict(constraint.to_string());
            }
        }
        Self::Database(error)
    }
}

/// Document-style persistence for the grading domain. Parent documents keep
/// id arrays of their children; appends are separate writes and are not
/// atomic with the child insert.
#[async_trait::async_trait]
pub(crate) trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_class(&self, params: CreateClass<'_>) -> Result<Class, StoreError>;
    async fn find_class(&self, id: &str) -> Result<Option<Class>, StoreError>;
    async fn list_classes_by_ids(&self, ids: &[String]) -> Result<Vec<Class>, StoreError>;
    async fn append_class_assessment(
        &self,
        class_id: &str,
        assessment_id: &str,
    ) -> Result<bool, StoreError>;
    /// `Ok(false)` when the class is full or already has the student.
    async fn enroll_student(&self, class_id: &str, student_id: &str) -> Result<bool, StoreError>;
    /// `Ok(false)` when the class did not list the student.
    async fn remove_student_from_class(
        &self,
        class_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError>;

    async fn create_student(&self, params: CreateStudent<'_>) -> Result<Student, StoreError>;
    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError>;
    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError>;
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;
    async fn list_students_by_ids(&self, ids: &[String]) -> Result<Vec<Student>, StoreError>;
    async fn append_student_submission(
        &self,
        student_id: &str,
        submission_id: &str,
    ) -> Result<bool, StoreError>;

    async fn create_assessment(
        &self,
        params: CreateAssessment<'_>,
    ) -> Result<Assessment, StoreError>;
    async fn find_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError>;
    async fn list_assessments_for_class(
        &self,
        class_id: &str,
    ) -> Result<Vec<Assessment>, StoreError>;
    async fn delete_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError>;
    async fn append_assessment_submission(
        &self,
        assessment_id: &str,
        submission_id: &str,
    ) -> Result<bool, StoreError>;

    async fn create_submission(
        &self,
        params: CreateSubmission<'_>,
    ) -> Result<Submission, StoreError>;
    async fn find_submission(&self, id: &str) -> Result<Option<Submission>, StoreError>;
    async fn find_latest_submission(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<Option<Submission>, StoreError>;
    async fn find_submission_by_report(
        &self,
        report_url: &str,
    ) -> Result<Option<Submission>, StoreError>;
    async fn update_submission_grading(
        &self,
        id: &str,
        report_url: &str,
        results: &[Value],
        updated_at: time::PrimitiveDateTime,
    ) -> Result<Option<Submission>, StoreError>;
    async fn list_submissions_for_assessment(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<Submission>, StoreError>;
    async fn list_submissions_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn create_teacher(&self, params: CreateTeacher<'_>) -> Result<Teacher, StoreError>;
    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, StoreError>;
    /// `Ok(false)` when the teacher already had the class.
    async fn assign_teacher_class(
        &self,
        teacher_id: &str,
        class_id: &str,
    ) -> Result<bool, StoreError>;

    async fn create_appeal(&self, params: CreateAppeal<'_>) -> Result<Appeal, StoreError>;
    async fn find_appeal(&self, id: &str) -> Result<Option<Appeal>, StoreError>;
    async fn list_appeals(&self) -> Result<Vec<Appeal>, StoreError>;
}
