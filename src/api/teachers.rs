use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::teachers::CreateTeacher;
use crate::schemas::assessment::{FolderResponse, GenerateExcelRequest};
use crate::schemas::class::ClassResponse;
use crate::schemas::teacher::{
    AssignClassRequest, TaughtClass, TeacherCreate, TeacherDetailsResponse, TeacherResponse,
    DEFAULT_ROLE,
};
use crate::services::pipeline::PipelineError;
use crate::services::reports::{build_report_rows, ReportError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_teacher))
        .route("/assign-class", post(assign_class))
        .route("/generate-excel", post(generate_excel))
        .route("/:teacher_email", get(get_teacher))
}

async fn create_teacher(
    State(state): State<AppState>,
    Json(payload): Json<TeacherCreate>,
) -> Result<(StatusCode, Json<TeacherResponse>), ApiError> {
    validate_payload(&payload)?;

    let teacher = state
        .store()
        .create_teacher(CreateTeacher {
            id: &Uuid::new_v4().to_string(),
            identity_id: payload.identity_id.trim(),
            email: payload.email.trim(),
            first_name: payload.first_name.as_deref().map(str::trim),
            last_name: payload.last_name.as_deref().map(str::trim),
            role: payload.role.as_deref().map(str::trim).unwrap_or(DEFAULT_ROLE),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::store(e, "Teacher"))?;

    tracing::info!(teacher_id = %teacher.id, role = %teacher.role, "Teacher created");
    Ok((StatusCode::CREATED, Json(TeacherResponse::from_db(teacher))))
}

async fn assign_class(
    State(state): State<AppState>,
    Json(payload): Json<AssignClassRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;
    let store = state.store();

    let teacher = store
        .find_teacher_by_email(payload.teacher_email.trim())
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch teacher"))?;
    let class = store
        .find_class(&payload.class_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?;
    let (Some(teacher), Some(class)) = (teacher, class) else {
        return Err(ApiError::NotFound("Teacher or class not found".to_string()));
    };

    let added = store
        .assign_teacher_class(&teacher.id, &class.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to assign class"))?;
    if !added {
        return Err(ApiError::Conflict("Class is already assigned to this teacher".to_string()));
    }

    tracing::info!(teacher_id = %teacher.id, class_id = %class.id, "Class assigned to teacher");
    Ok(Json(json!({ "message": "Class assigned successfully" })))
}

/// Profile plus every taught class with its folders.
async fn get_teacher(
    Path(teacher_email): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TeacherDetailsResponse>, ApiError> {
    let store = state.store();
    let teacher = store
        .find_teacher_by_email(teacher_email.trim())
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?;

    let classes = store
        .list_classes_by_ids(&teacher.class_ids)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list classes"))?;
    let mut taught = Vec::with_capacity(classes.len());
    for class in classes {
        let folders = store
            .list_assessments_for_class(&class.id)
            .await
            .map_err(|e| ApiError::store(e, "Failed to list assessments"))?;
        taught.push(TaughtClass {
            class: ClassResponse::from_db(class),
            folders: folders.into_iter().map(FolderResponse::from_db).collect(),
        });
    }

    Ok(Json(TeacherDetailsResponse {
        name: teacher.display_name(),
        role: teacher.role,
        email: teacher.email,
        classes: taught,
    }))
}

async fn generate_excel(
    State(state): State<AppState>,
    Json(payload): Json<GenerateExcelRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_payload(&payload)?;

    let rows = build_report_rows(state.store(), &payload.folder_id).await.map_err(|e| match e {
        ReportError::AssessmentNotFound => ApiError::NotFound(e.to_string()),
        ReportError::NoSubmissions => ApiError::BadRequest(e.to_string()),
        ReportError::Store(source) => ApiError::store(source, "Failed to load submissions"),
    })?;

    let sheet = state
        .engine()
        .generate_report_sheet(&rows)
        .await
        .map_err(|e| ApiError::from(PipelineError::from(e)))?;

    tracing::info!(assessment_id = %payload.folder_id, rows = rows.len(), "Report sheet generated");
    Ok(Json(json!({ "excelUrl": sheet.excel_url })))
}
