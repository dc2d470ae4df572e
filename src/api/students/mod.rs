mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_students).post(handlers::create_student))
        .route("/enroll", post(handlers::enroll_student))
        .route("/remove", post(handlers::remove_student))
        .route("/classes", get(handlers::list_enrolled_classes))
        .route("/submissions", get(handlers::list_submissions))
        .route("/submit-task", post(handlers::submit_task))
}
