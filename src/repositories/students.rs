use sqlx::PgPool;

use crate::db::models::Student;

const COLUMNS: &str = "\
    id, identity_id, email, first_name, last_name, enrolled_class_ids, submission_ids, created_at";

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) identity_id: &'a str,
    pub(crate) email: &'a str,
    pub(crate) first_name: Option<&'a str>,
    pub(crate) last_name: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateStudent<'_>) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (id, identity_id, email, first_name, last_name, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.identity_id)
    .bind(params.email)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students ORDER BY created_at, id"))
        .fetch_all(pool)
        .await
}

pub(crate) async fn list_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = ANY($1) ORDER BY created_at, id"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn append_submission(
    pool: &PgPool,
    student_id: &str,
    submission_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE students SET submission_ids = array_append(submission_ids, $2) WHERE id = $1",
    )
    .bind(student_id)
    .bind(submission_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
