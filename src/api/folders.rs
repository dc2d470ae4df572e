use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::{read_text, read_upload, required, UploadedFile};
use crate::core::state::AppState;
use crate::core::time::{parse_due_date, primitive_now_utc};
use crate::repositories::assessments::CreateAssessment;
use crate::schemas::assessment::FolderResponse;
use crate::schemas::rubric::Rubric;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/add-folder", post(add_folder))
        .route("/delete-folder/:folder_id", delete(delete_folder))
        .route("/:folder_id", get(get_folder))
}

#[derive(Default)]
struct FolderForm {
    name: Option<String>,
    description: Option<String>,
    class_id: Option<String>,
    due_date: Option<String>,
    rubric: Option<String>,
    question_file: Option<UploadedFile>,
    key_file: Option<UploadedFile>,
}

async fn add_folder(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let storage = state.settings().storage();
    let mut form = FolderForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "name" => form.name = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "classId" | "class_id" => form.class_id = Some(read_text(field).await?),
            "dueDate" | "due_date" => form.due_date = Some(read_text(field).await?),
            "rubric" => form.rubric = Some(read_text(field).await?),
            "questionFile" | "question_file" => {
                form.question_file = Some(read_upload(field, storage).await?)
            }
            "keyFile" | "key_file" => form.key_file = Some(read_upload(field, storage).await?),
            _ => {}
        }
    }

    let name = required(form.name, "name")?;
    let class_id = required(form.class_id, "classId")?;
    let key_file =
        form.key_file.ok_or_else(|| ApiError::BadRequest("keyFile is required".to_string()))?;
    let rubric_raw = required(form.rubric, "rubric")?;
    let rubric: Rubric = serde_json::from_str(&rubric_raw)
        .map_err(|e| ApiError::BadRequest(format!("rubric is not valid JSON: {e}")))?;
    rubric.validate().map_err(|e| ApiError::BadRequest(format!("Invalid rubric: {e}")))?;

    let due_date = match form.due_date.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            parse_due_date(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid dueDate '{raw}'")))?,
        ),
        None => None,
    };

    state
        .store()
        .find_class(&class_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))?;

    let question_file = match form.question_file {
        Some(file) => Some(upload_file(&state, "questions", file).await?),
        None => None,
    };
    let key_file = upload_file(&state, "keys", key_file).await?;

    let assessment = state
        .store()
        .create_assessment(CreateAssessment {
            id: &Uuid::new_v4().to_string(),
            class_id: &class_id,
            name: &name,
            description: form.description.as_deref().filter(|text| !text.is_empty()),
            question_file: question_file.as_deref(),
            key_file: Some(&key_file),
            due_date,
            rubric: &rubric,
            total_marks: rubric.total_marks(),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::store(e, "Failed to create assessment"))?;

    let linked = state
        .store()
        .append_class_assessment(&class_id, &assessment.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to link assessment to class"))?;
    if !linked {
        tracing::warn!(assessment_id = %assessment.id, %class_id, "Class vanished before linking");
    }

    tracing::info!(
        assessment_id = %assessment.id,
        total_marks = assessment.total_marks,
        questions = rubric.questions.len(),
        "Assessment created"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Folder created successfully",
            "folder": FolderResponse::from_db(assessment),
        })),
    ))
}

async fn upload_file(
    state: &AppState,
    folder: &str,
    file: UploadedFile,
) -> Result<String, ApiError> {
    let stored = state
        .blobs()
        .upload(folder, &file.filename, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::blob(e, "Failed to upload file"))?;
    tracing::debug!(key = %stored.key, size = stored.size, sha256 = %stored.sha256, "File uploaded");
    Ok(stored.url)
}

async fn get_folder(
    Path(folder_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FolderResponse>, ApiError> {
    let assessment = state
        .store()
        .find_assessment(&folder_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Folder not found".to_string()))?;

    Ok(Json(FolderResponse::from_db(assessment)))
}

async fn delete_folder(
    Path(folder_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .store()
        .delete_assessment(&folder_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to delete assessment"))?
        .ok_or_else(|| ApiError::NotFound("Folder not found".to_string()))?;

    tracing::info!(assessment_id = %deleted.id, "Assessment deleted");
    Ok(Json(json!({ "message": "Folder deleted successfully" })))
}
