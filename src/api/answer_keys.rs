use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use crate::api::errors::ApiError;
use crate::api::validation::{read_upload, UploadedFile};
use crate::core::state::AppState;
use crate::services::grading_engine::EngineFile;
use crate::services::pipeline::PipelineError;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/upload-key", post(upload_key))
}

/// Extracts question/answer pairs from a key file. Only the versioned engine
/// API offers this.
async fn upload_key(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut key_file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if matches!(name.as_str(), "keyFile" | "key_file") {
            key_file = Some(read_upload(field, state.settings().storage()).await?);
        }
    }

    let key_file = key_file.ok_or_else(|| ApiError::BadRequest("keyFile is required".to_string()))?;
    let qa_pairs = state
        .engine()
        .upload_answer_key(EngineFile { file_name: key_file.filename, bytes: key_file.bytes })
        .await
        .map_err(|e| ApiError::from(PipelineError::from(e)))?;

    tracing::info!(pairs = qa_pairs.len(), "Answer key processed");
    Ok(Json(json!({
        "message": "Answer key processed successfully",
        "qa_pairs": qa_pairs,
    })))
}
