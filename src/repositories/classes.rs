use sqlx::PgPool;

use crate::db::models::Class;

const COLUMNS: &str = "\
    id, class_code, class_name, capacity, student_ids, assessment_ids, teacher_id, created_at";

pub(crate) struct CreateClass<'a> {
    pub(crate) id: &'a str,
    pub(crate) class_code: &'a str,
    pub(crate) class_name: &'a str,
    pub(crate) capacity: i32,
    pub(crate) teacher_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateClass<'_>) -> Result<Class, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "INSERT INTO classes (id, class_code, class_name, capacity, teacher_id, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.class_code)
    .bind(params.class_name)
    .bind(params.capacity)
    .bind(params.teacher_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Missing ids are skipped; rows come back in creation order.
pub(crate) async fn list_by_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes WHERE id = ANY($1) ORDER BY created_at, id"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn append_assessment(
    pool: &PgPool,
    class_id: &str,
    assessment_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE classes SET assessment_ids = array_append(assessment_ids, $2) WHERE id = $1",
    )
    .bind(class_id)
    .bind(assessment_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Links student and class in both directions. Returns `false` without
/// writing anything when the class is full or already lists the student.
pub(crate) async fn enroll_student(
    pool: &PgPool,
    class_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE classes
         SET student_ids = array_append(student_ids, $2)
         WHERE id = $1
           AND NOT ($2 = ANY(student_ids))
           AND cardinality(student_ids) < capacity",
    )
    .bind(class_id)
    .bind(student_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE students
         SET enrolled_class_ids = array_append(enrolled_class_ids, $2)
         WHERE id = $1 AND NOT ($2 = ANY(enrolled_class_ids))",
    )
    .bind(student_id)
    .bind(class_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// Unlinks student and class on both sides. Returns `false` when the class
/// did not list the student.
pub(crate) async fn remove_student(
    pool: &PgPool,
    class_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "UPDATE classes
         SET student_ids = array_remove(student_ids, $2)
         WHERE id = $1 AND $2 = ANY(student_ids)",
    )
    .bind(class_id)
    .bind(student_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE students SET enrolled_class_ids = array_remove(enrolled_class_ids, $2) WHERE id = $1",
    )
    .bind(student_id)
    .bind(class_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated.rows_affected() > 0)
}
