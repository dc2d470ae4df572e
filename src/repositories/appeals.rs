use sqlx::PgPool;

use crate::db::models::Appeal;

const COLUMNS: &str =
    "id, grading_report, student_email, assessment_id, key_file, description, created_at";

pub(crate) struct CreateAppeal<'a> {
    pub(crate) id: &'a str,
    pub(crate) grading_report: &'a str,
    pub(crate) student_email: &'a str,
    pub(crate) assessment_id: &'a str,
    pub(crate) key_file: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateAppeal<'_>) -> Result<Appeal, sqlx::Error> {
    sqlx::query_as::<_, Appeal>(&format!(
        "INSERT INTO appeals (
            id, grading_report, student_email, assessment_id, key_file, description, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.grading_report)
    .bind(params.student_email)
    .bind(params.assessment_id)
    .bind(params.key_file)
    .bind(params.description)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Appeal>, sqlx::Error> {
    sqlx::query_as::<_, Appeal>(&format!("SELECT {COLUMNS} FROM appeals WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_recent(pool: &PgPool) -> Result<Vec<Appeal>, sqlx::Error> {
    sqlx::query_as::<_, Appeal>(&format!("SELECT {COLUMNS} FROM appeals ORDER BY created_at DESC"))
        .fetch_all(pool)
        .await
}
