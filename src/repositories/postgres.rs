use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::{Appeal, Assessment, Class, Student, Submission, Teacher};
use crate::repositories::appeals::{self, CreateAppeal};
use crate::repositories::assessments::{self, CreateAssessment};
use crate::repositories::classes::{self, CreateClass};
use crate::repositories::students::{self, CreateStudent};
use crate::repositories::submissions::{self, CreateSubmission};
use crate::repositories::teachers::{self, CreateTeacher};
use crate::repositories::{health, Store, StoreError};

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health::ping(&self.pool).await?)
    }

    async fn create_class(&self, params: CreateClass<'_>) -> Result<Class, StoreError> {
        Ok(classes::create(&self.pool, params).await?)
    }

    async fn find_class(&self, id: &str) -> Result<Option<Class>, StoreError> {
        Ok(classes::find_by_id(&self.pool, id).await?)
    }

    async fn list_classes_by_ids(&self, ids: &[String]) -> Result<Vec<Class>, StoreError> {
        Ok(classes::list_by_ids(&self.pool, ids).await?)
    }

    async fn append_class_assessment(
        &self,
        class_id: &str,
        assessment_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(classes::append_assessment(&self.pool, class_id, assessment_id).await?)
    }

    async fn enroll_student(&self, class_id: &str, student_id: &str) -> Result<bool, StoreError> {
        Ok(classes::enroll_student(&self.pool, class_id, student_id).await?)
    }

    async fn remove_student_from_class(
        &self,
        class_id: &str,
        student_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(classes::remove_student(&self.pool, class_id, student_id).await?)
    }

    async fn create_student(&self, params: CreateStudent<'_>) -> Result<Student, StoreError> {
        Ok(students::create(&self.pool, params).await?)
    }

    async fn find_student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        Ok(students::find_by_id(&self.pool, id).await?)
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StoreError> {
        Ok(students::find_by_email(&self.pool, email).await?)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        Ok(students::list_all(&self.pool).await?)
    }

    async fn list_students_by_ids(&self, ids: &[String]) -> Result<Vec<Student>, StoreError> {
        Ok(students::list_by_ids(&self.pool, ids).await?)
    }

    async fn append_student_submission(
        &self,
        student_id: &str,
        submission_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(students::append_submission(&self.pool, student_id, submission_id).await?)
    }

    async fn create_assessment(
        &self,
        params: CreateAssessment<'_>,
    ) -> Result<Assessment, StoreError> {
        Ok(assessments::create(&self.pool, params).await?)
    }

    async fn find_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError> {
        Ok(assessments::find_by_id(&self.pool, id).await?)
    }

    async fn list_assessments_for_class(
        &self,
        class_id: &str,
    ) -> Result<Vec<Assessment>, StoreError> {
        Ok(assessments::list_by_class(&self.pool, class_id).await?)
    }

    async fn delete_assessment(&self, id: &str) -> Result<Option<Assessment>, StoreError> {
        Ok(assessments::delete(&self.pool, id).await?)
    }

    async fn append_assessment_submission(
        &self,
        assessment_id: &str,
        submission_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(assessments::append_submission(&self.pool, assessment_id, submission_id).await?)
    }

    async fn create_submission(
        &self,
        params: CreateSubmission<'_>,
    ) -> Result<Submission, StoreError> {
        Ok(submissions::create(&self.pool, params).await?)
    }

    async fn find_submission(&self, id: &str) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_by_id(&self.pool, id).await?)
    }

    async fn find_latest_submission(
        &self,
        assessment_id: &str,
        student_id: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_latest_for_student(&self.pool, assessment_id, student_id).await?)
    }

    async fn find_submission_by_report(
        &self,
        report_url: &str,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::find_by_grading_report(&self.pool, report_url).await?)
    }

    async fn update_submission_grading(
        &self,
        id: &str,
        report_url: &str,
        results: &[Value],
        updated_at: time::PrimitiveDateTime,
    ) -> Result<Option<Submission>, StoreError> {
        Ok(submissions::update_grading(&self.pool, id, report_url, results, updated_at).await?)
    }

    async fn list_submissions_for_assessment(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<Submission>, StoreError> {
        Ok(submissions::list_by_assessment(&self.pool, assessment_id).await?)
    }

    async fn list_submissions_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Submission>, StoreError> {
        Ok(submissions::list_by_student(&self.pool, student_id).await?)
    }

    async fn create_teacher(&self, params: CreateTeacher<'_>) -> Result<Teacher, StoreError> {
        Ok(teachers::create(&self.pool, params).await?)
    }

    async fn find_teacher_by_email(&self, email: &str) -> Result<Option<Teacher>, StoreError> {
        Ok(teachers::find_by_email(&self.pool, email).await?)
    }

    async fn assign_teacher_class(
        &self,
        teacher_id: &str,
        class_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(teachers::assign_class(&self.pool, teacher_id, class_id).await?)
    }

    async fn create_appeal(&self, params: CreateAppeal<'_>) -> Result<Appeal, StoreError> {
        Ok(appeals::create(&self.pool, params).await?)
    }

    async fn find_appeal(&self, id: &str) -> Result<Option<Appeal>, StoreError> {
        Ok(appeals::find_by_id(&self.pool, id).await?)
    }

    async fn list_appeals(&self) -> Result<Vec<Appeal>, StoreError> {
        Ok(appeals::list_recent(&self.pool).await?)
    }
}
