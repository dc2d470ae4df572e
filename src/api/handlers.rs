use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: format!("{} is running", state.settings().api().project_name),
        version: state.settings().api().version.clone(),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut status = "healthy".to_string();
    let mut components = HashMap::new();

    match state.store().ping().await {
        Ok(()) => {
            components.insert("database".to_string(), "healthy".to_string());
        }
        Err(err) => {
            components.insert("database".to_string(), format!("unhealthy: {err}"));
            status = "unhealthy".to_string();
        }
    }

    let engine = state.engine().check_health().await;
    if engine.healthy {
        components.insert("grading_engine".to_string(), "healthy".to_string());
    } else {
        let reason = engine
            .error
            .or_else(|| engine.status_code.map(|code| format!("status {code}")))
            .unwrap_or_else(|| "unknown".to_string());
        components.insert("grading_engine".to_string(), format!("unhealthy: {reason}"));
        if status == "healthy" {
            status = "degraded".to_string();
        }
    }

    Json(HealthResponse { service: "smartgrade-api".to_string(), status, components })
}

/// Engine health, status and the resolved backend, fetched concurrently.
pub(crate) async fn grading_health(State(state): State<AppState>) -> Json<Value> {
    let engine = state.engine();
    let (health, status) = tokio::join!(engine.check_health(), engine.status());
    let staging = state.pipeline().staging();

    Json(json!({
        "engine": {
            "health": health,
            "status": status,
            "backend_info": engine.backend_info(),
        },
        "staging": {
            "dir": staging.instance_dir().display().to_string(),
            "live_batches": staging.live_batches(),
        }
    }))
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
