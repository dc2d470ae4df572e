use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Submission;

const COLUMNS: &str = "\
    id, task_name, assessment_id, student_id, submission_file, grading_report, \
    grading_results, submitted_at, updated_at";

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) task_name: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) submission_file: &'a str,
    pub(crate) grading_report: Option<&'a str>,
    pub(crate) grading_results: &'a [Value],
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, task_name, assessment_id, student_id, submission_file,
            grading_report, grading_results, submitted_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.task_name)
    .bind(params.assessment_id)
    .bind(params.student_id)
    .bind(params.submission_file)
    .bind(params.grading_report)
    .bind(Json(params.grading_results))
    .bind(params.submitted_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_latest_for_student(
    pool: &PgPool,
    assessment_id: &str,
    student_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE assessment_id = $1 AND student_id = $2
         ORDER BY submitted_at DESC, id DESC
         LIMIT 1"
    ))
    .bind(assessment_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_grading_report(
    pool: &PgPool,
    report_url: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS}
         FROM submissions
         WHERE grading_report = $1
         ORDER BY submitted_at DESC
         LIMIT 1"
    ))
    .bind(report_url)
    .fetch_optional(pool)
    .await
}

/// Overwrites only the grading fields; the submitted file and timestamp stay.
pub(crate) async fn update_grading(
    pool: &PgPool,
    id: &str,
    report_url: &str,
    results: &[Value],
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET grading_report = $2, grading_results = $3, updated_at = $4
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(report_url)
    .bind(Json(results))
    .bind(updated_at)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_assessment(
    pool: &PgPool,
    assessment_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE assessment_id = $1 ORDER BY submitted_at"
    ))
    .bind(assessment_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE student_id = $1 ORDER BY submitted_at DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}
