use axum::{
    extract::State,
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
use crate::repositories::appeals::CreateAppeal;
use crate::schemas::appeal::{AppealCreate, AppealResponse, RecheckRequest, RecheckResponse};
use crate::services::pipeline::RecheckAppeal;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appeals))
        .route("/submit", post(submit_appeal))
        .route("/recheck", post(recheck_appeal))
}

/// Files an appeal against a graded submission. The assessment's key file at
/// this moment is captured and used for any later recheck.
async fn submit_appeal(
    State(state): State<AppState>,
    Json(payload): Json<AppealCreate>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    validate_payload(&payload)?;
    let store = state.store();

    let submission = store
        .find_submission_by_report(payload.grading_report.trim())
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch submission"))?
        .ok_or_else(|| {
            ApiError::NotFound("Submission not found for the provided grading report".to_string())
        })?;
    let assessment = store
        .find_assessment(&submission.assessment_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch assessment"))?
        .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;
    let key_file = assessment.key_file.ok_or_else(|| {
        ApiError::Unprocessable("Assessment has no key file to recheck against".to_string())
    })?;

    let appeal = store
        .create_appeal(CreateAppeal {
            id: &Uuid::new_v4().to_string(),
            grading_report: payload.grading_report.trim(),
            student_email: payload.student_email.trim(),
            assessment_id: &assessment.id,
            key_file: &key_file,
            description: payload.description.trim(),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::store(e, "Failed to create appeal"))?;

    tracing::info!(appeal_id = %appeal.id, submission_id = %submission.id, "Appeal submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appeal submitted successfully",
            "appeal": AppealResponse::from_db(appeal),
        })),
    ))
}

async fn list_appeals(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let appeals = state
        .store()
        .list_appeals()
        .await
        .map_err(|e| ApiError::store(e, "Failed to list appeals"))?
        .into_iter()
        .map(AppealResponse::from_db)
        .collect::<Vec<_>>();

    Ok(Json(json!({ "appeals": appeals })))
}

async fn recheck_appeal(
    State(state): State<AppState>,
    Json(payload): Json<RecheckRequest>,
) -> Result<Json<RecheckResponse>, ApiError> {
    validate_payload(&payload)?;

    if let Some(appeal_id) = payload.appeal_id.as_deref() {
        state
            .store()
            .find_appeal(appeal_id)
            .await
            .map_err(|e| ApiError::store(e, "Failed to fetch appeal"))?
            .ok_or_else(|| ApiError::NotFound("Appeal not found".to_string()))?;
    }

    let outcome = state
        .pipeline()
        .recheck(RecheckAppeal {
            student_email: payload.student_email,
            key_file_url: payload.key_file,
            assessment_id: payload.assessment_id,
            appeal_id: payload.appeal_id,
        })
        .await?;

    Ok(Json(RecheckResponse {
        message: "Appeal rechecked successfully",
        submission_id: outcome.submission_id,
        new_grading_report_url: outcome.report_url,
        grading_results: outcome.results,
    }))
}
