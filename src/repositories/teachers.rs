use sqlx::PgPool;

use crate::db::models::Teacher;

const COLUMNS: &str = "\
    id, identity_id, email, first_name, last_name, role, class_ids, created_at";

pub(crate) struct CreateTeacher<'a> {
    pub(crate) id: &'a str,
    pub(crate) identity_id: &'a str,
    pub(crate) email: &'a str,
    pub(crate) first_name: Option<&'a str>,
    pub(crate) last_name: Option<&'a str>,
    pub(crate) role: &'a str,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateTeacher<'_>) -> Result<Teacher, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "INSERT INTO teachers (id, identity_id, email, first_name, last_name, role, created_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.identity_id)
    .bind(params.email)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.role)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Teacher>, sqlx::Error> {
    sqlx::query_as::<_, Teacher>(&format!(
        "SELECT {COLUMNS} FROM teachers WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Moves the class to the teacher: any previous owner loses it and the class
/// records its new teacher. Returns `false` when the teacher already had it.
pub(crate) async fn assign_class(
    pool: &PgPool,
    teacher_id: &str,
    class_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE teachers
         SET class_ids = array_remove(class_ids, $2)
         WHERE id <> $1 AND $2 = ANY(class_ids)",
    )
    .bind(teacher_id)
    .bind(class_id)
    .execute(&mut *tx)
    .await?;

    let updated = sqlx::query(
        "UPDATE teachers
         SET class_ids = array_append(class_ids, $2)
         WHERE id = $1 AND NOT ($2 = ANY(class_ids))",
    )
    .bind(teacher_id)
    .bind(class_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE classes SET teacher_id = $2 WHERE id = $1")
        .bind(class_id)
        .bind(teacher_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(updated.rows_affected() > 0)
}
