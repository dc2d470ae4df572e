use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Assessment;
use crate::schemas::rubric::Rubric;

const COLUMNS: &str = "\
    id, class_id, name, description, question_file, key_file, due_date, rubric, \
    total_marks, submission_ids, created_at";

pub(crate) struct CreateAssessment<'a> {
    pub(crate) id: &'a str,
    pub(crate) class_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) question_file: Option<&'a str>,
    pub(crate) key_file: Option<&'a str>,
    pub(crate) due_date: Option<time::PrimitiveDateTime>,
    pub(crate) rubric: &'a Rubric,
    pub(crate) total_marks: f64,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAssessment<'_>,
) -> Result<Assessment, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "INSERT INTO assessments (
            id, class_id, name, description, question_file, key_file, due_date,
            rubric, total_marks, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.class_id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.question_file)
    .bind(params.key_file)
    .bind(params.due_date)
    .bind(Json(params.rubric))
    .bind(params.total_marks)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!("SELECT {COLUMNS} FROM assessments WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_class(
    pool: &PgPool,
    class_id: &str,
) -> Result<Vec<Assessment>, sqlx::Error> {
    sqlx::query_as::<_, Assessment>(&format!(
        "SELECT {COLUMNS} FROM assessments WHERE class_id = $1 ORDER BY created_at, id"
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await
}

/// Deletes the assessment and pulls its id from the owning class.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<Option<Assessment>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query_as::<_, Assessment>(&format!(
        "DELETE FROM assessments WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(assessment) = &deleted {
        sqlx::query(
            "UPDATE classes SET assessment_ids = array_remove(assessment_ids, $2) WHERE id = $1",
        )
        .bind(&assessment.class_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(deleted)
}

pub(crate) async fn append_submission(
    pool: &PgPool,
    assessment_id: &str,
    submission_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assessments SET submission_ids = array_append(submission_ids, $2) WHERE id = $1",
    )
    .bind(assessment_id)
    .bind(submission_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
