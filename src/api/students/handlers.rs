use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::{read_text, read_upload, required, validate_payload, UploadedFile};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::students::CreateStudent;
use crate::schemas::class::ClassResponse;
use crate::db::models::Student;
use crate::schemas::student::{
    ClassMembershipRequest, StudentCreate, StudentEmailQuery, StudentResponse,
};
use crate::schemas::submission::{SubmissionResponse, SubmitTaskResponse};
use crate::services::pipeline::SubmitTask;

pub(super) async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    validate_payload(&payload)?;

    let student = state
        .store()
        .create_student(CreateStudent {
            id: &Uuid::new_v4().to_string(),
            identity_id: payload.identity_id.trim(),
            email: payload.email.trim(),
            first_name: payload.first_name.as_deref().map(str::trim),
            last_name: payload.last_name.as_deref().map(str::trim),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::store(e, "Student"))?;

    tracing::info!(student_id = %student.id, "Student created");
    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

pub(super) async fn list_students(
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let students = state
        .store()
        .list_students()
        .await
        .map_err(|e| ApiError::store(e, "Failed to list students"))?;

    Ok(Json(students.into_iter().map(StudentResponse::from_db).collect()))
}

async fn load_student(state: &AppState, email: &str) -> Result<Student, ApiError> {
    state
        .store()
        .find_student_by_email(email)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))
}

pub(super) async fn enroll_student(
    State(state): State<AppState>,
    Json(payload): Json<ClassMembershipRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let store = state.store();

    let student = load_student(&state, &payload.student_email).await?;
    let class = store
        .find_class(&payload.class_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    if class.student_ids.iter().any(|id| id == &student.id) {
        return Err(ApiError::Conflict("Student is already enrolled in this class".to_string()));
    }

    let enrolled = store
        .enroll_student(&class.id, &student.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to enroll student"))?;
    if !enrolled {
        return Err(ApiError::BadRequest("Class is full".to_string()));
    }

    let class = store
        .find_class(&class.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;
    let student = store
        .find_student(&student.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    tracing::info!(student_id = %student.id, class_id = %class.id, "Student enrolled");
    Ok(Json(json!({
        "message": "Student enrolled successfully",
        "student": StudentResponse::from_db(student),
        "class": ClassResponse::from_db(class),
    })))
}

/// Pulls the student out of the class on both sides.
pub(super) async fn remove_student(
    State(state): State<AppState>,
    Json(payload): Json<ClassMembershipRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let store = state.store();

    let student = load_student(&state, &payload.student_email).await?;
    let class = store
        .find_class(&payload.class_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    let removed = store
        .remove_student_from_class(&class.id, &student.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to remove student"))?;
    if !removed {
        return Err(ApiError::BadRequest("Student is not enrolled in this class".to_string()));
    }

    let class = store
        .find_class(&class.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    tracing::info!(student_id = %student.id, class_id = %class.id, "Student removed from class");
    Ok(Json(json!({
        "message": "Student removed from class successfully",
        "class": ClassResponse::from_db(class),
    })))
}

pub(super) async fn list_enrolled_classes(
    State(state): State<AppState>,
    Query(query): Query<StudentEmailQuery>,
) -> Result<Json<Value>, ApiError> {
    let student = load_student(&state, query.student_email.trim()).await?;
    let store = state.store();

    let classes = store
        .list_classes_by_ids(&student.enrolled_class_ids)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list classes"))?
        .into_iter()
        .map(ClassResponse::from_db)
        .collect::<Vec<_>>();
    let submissions = store
        .list_submissions_for_student(&student.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list submissions"))?
        .into_iter()
        .map(SubmissionResponse::from_db)
        .collect::<Vec<_>>();

    Ok(Json(json!({ "classes": classes, "submissions": submissions })))
}

pub(super) async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<StudentEmailQuery>,
) -> Result<Json<Value>, ApiError> {
    let student = load_student(&state, query.student_email.trim()).await?;

    let submissions = state
        .store()
        .list_submissions_for_student(&student.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list submissions"))?
        .into_iter()
        .map(SubmissionResponse::from_db)
        .collect::<Vec<_>>();

    Ok(Json(json!({ "submissions": submissions })))
}

/// Uploads the answer file, then grades it synchronously. The student and
/// assessment are checked first so a bad request never reaches the bucket.
pub(super) async fn submit_task(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitTaskResponse>, ApiError> {
    let storage = state.settings().storage();
    let mut file: Option<UploadedFile> = None;
    let mut folder_id: Option<String> = None;
    let mut task_name: Option<String> = None;
    let mut student_email: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "submissionFile" | "submission_file" => file = Some(read_upload(field, storage).await?),
            "folderId" | "folder_id" => folder_id = Some(read_text(field).await?),
            "taskName" | "task_name" => task_name = Some(read_text(field).await?),
            "studentEmail" | "student_email" => student_email = Some(read_text(field).await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("submissionFile is required".to_string()))?;
    let folder_id = required(folder_id, "folderId")?;
    let task_name = required(task_name, "taskName")?;
    let student_email = required(student_email, "studentEmail")?;

    let store = state.store();
    store
        .find_student_by_email(&student_email)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;
    store
        .find_assessment(&folder_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;

    let uploaded = state
        .blobs()
        .upload("submissions", &file.filename, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::blob(e, "Failed to upload submission"))?;
    tracing::debug!(
        key = %uploaded.key,
        size = uploaded.size,
        sha256 = %uploaded.sha256,
        "Answer file uploaded"
    );

    let outcome = state
        .pipeline()
        .submit(SubmitTask {
            student_email,
            assessment_id: folder_id,
            task_name,
            answer_file_url: uploaded.url,
        })
        .await?;

    Ok(Json(SubmitTaskResponse {
        message: "Task submitted and graded successfully",
        submission_id: outcome.submission_id,
        grading_report_url: outcome.report_url,
        grading_results: outcome.results,
    }))
}
