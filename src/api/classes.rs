use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::validation::validate_payload;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Class;
use crate::repositories::classes::CreateClass;
use crate::schemas::assessment::FolderResponse;
use crate::schemas::class::{
    ClassCreate, ClassFoldersResponse, ClassResponse, ClassRosterResponse,
};
use crate::schemas::student::StudentResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class))
        .route("/:class_id", get(get_class))
        .route("/:class_id/students", get(list_class_students))
        .route("/:class_id/folders", get(list_class_folders))
}

async fn create_class(
    State(state): State<AppState>,
    Json(payload): Json<ClassCreate>,
) -> Result<(StatusCode, Json<ClassResponse>), ApiError> {
    validate_payload(&payload)?;
    let store = state.store();

    let teacher = match payload.teacher_email.as_deref().map(str::trim) {
        Some(email) => Some(
            store
                .find_teacher_by_email(email)
                .await
                .map_err(|e| ApiError::store(e, "Failed to fetch teacher"))?
                .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?,
        ),
        None => None,
    };

    let class = store
        .create_class(CreateClass {
            id: &Uuid::new_v4().to_string(),
            class_code: payload.class_code.trim(),
            class_name: payload.class_name.trim(),
            capacity: payload.capacity,
            teacher_id: teacher.as_ref().map(|teacher| teacher.id.as_str()),
            created_at: primitive_now_utc(),
        })
        .await
        .map_err(|e| ApiError::store(e, "Class code"))?;

    if let Some(teacher) = &teacher {
        store
            .assign_teacher_class(&teacher.id, &class.id)
            .await
            .map_err(|e| ApiError::store(e, "Failed to assign class to teacher"))?;
    }

    tracing::info!(class_id = %class.id, class_code = %class.class_code, "Class created");
    Ok((StatusCode::CREATED, Json(ClassResponse::from_db(class))))
}

async fn load_class(state: &AppState, class_id: &str) -> Result<Class, ApiError> {
    state
        .store()
        .find_class(class_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch class"))?
        .ok_or_else(|| ApiError::NotFound("Class not found".to_string()))
}

async fn get_class(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClassResponse>, ApiError> {
    let class = load_class(&state, &class_id).await?;
    Ok(Json(ClassResponse::from_db(class)))
}

async fn list_class_students(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClassRosterResponse>, ApiError> {
    let class = load_class(&state, &class_id).await?;
    let students = state
        .store()
        .list_students_by_ids(&class.student_ids)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list students"))?;

    Ok(Json(ClassRosterResponse {
        class_name: class.class_name,
        students: students.into_iter().map(StudentResponse::from_db).collect(),
    }))
}

async fn list_class_folders(
    Path(class_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClassFoldersResponse>, ApiError> {
    let class = load_class(&state, &class_id).await?;
    let folders = state
        .store()
        .list_assessments_for_class(&class.id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to list assessments"))?;

    Ok(Json(ClassFoldersResponse {
        class_name: class.class_name,
        folders: folders.into_iter().map(FolderResponse::from_db).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::repositories::Store;
    use crate::test_support::{json_request, read_json, seed_grading_fixture, setup_test_context};

    #[tokio::test]
    async fn create_then_fetch_class() {
        let ctx = setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/classes",
                Some(json!({"classCode": "PHY101", "className": "Physics", "capacity": 2})),
            ))
            .await
            .expect("create");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = read_json(response).await;
        assert_eq!(created["classCode"], "PHY101");
        assert_eq!(created["students"], json!([]));

        let id = created["id"].as_str().expect("id");
        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, &format!("/api/classes/{id}"), None))
            .await
            .expect("fetch");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["className"], "Physics");
    }

    #[tokio::test]
    async fn duplicate_code_conflicts_and_bad_capacity_is_rejected() {
        let ctx = setup_test_context().await;
        let body = json!({"class_code": "CHEM", "class_name": "Chemistry", "capacity": 10});

        let first = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/classes", Some(body.clone())))
            .await
            .expect("first");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = ctx
            .app
            .clone()
            .oneshot(json_request(Method::POST, "/api/classes", Some(body)))
            .await
            .expect("second");
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let invalid = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/classes",
                Some(json!({"classCode": "BIO", "className": "Biology", "capacity": 0})),
            ))
            .await
            .expect("invalid");
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn class_roster_and_folders_list_members() {
        let ctx = setup_test_context().await;
        let fixture = seed_grading_fixture(&ctx.store, &ctx.blobs).await;
        let class_id = fixture.class.id.clone();
        assert!(ctx.store.enroll_student(&class_id, &fixture.student.id).await.expect("enroll"));

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, &format!("/api/classes/{class_id}/students"), None))
            .await
            .expect("roster");
        assert_eq!(response.status(), StatusCode::OK);
        let roster = read_json(response).await;
        assert_eq!(roster["className"], "Thermodynamics");
        assert_eq!(roster["students"].as_array().map(Vec::len), Some(1));
        assert_eq!(roster["students"][0]["email"], "s1@example.com");

        let response = ctx
            .app
            .clone()
            .oneshot(json_request(Method::GET, &format!("/api/classes/{class_id}/folders"), None))
            .await
            .expect("folders");
        assert_eq!(response.status(), StatusCode::OK);
        let folders = read_json(response).await;
        assert_eq!(folders["className"], "Thermodynamics");
        assert_eq!(folders["folders"][0]["id"], fixture.assessment.id.as_str());
        assert_eq!(folders["folders"][0]["classId"], class_id.as_str());
    }

    #[tokio::test]
    async fn listings_for_unknown_class_are_404() {
        let ctx = setup_test_context().await;

        for path in ["/api/classes/missing/students", "/api/classes/missing/folders"] {
            let response = ctx
                .app
                .clone()
                .oneshot(json_request(Method::GET, path, None))
                .await
                .expect("listing");
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(read_json(response).await["detail"], "Class not found");
        }
    }

    #[tokio::test]
    async fn class_created_for_a_teacher_is_linked_both_ways() {
        let ctx = setup_test_context().await;

        let unknown = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/classes",
                Some(json!({
                    "classCode": "BIO", "className": "Biology", "capacity": 5,
                    "teacherEmail": "nobody@example.com"
                })),
            ))
            .await
            .expect("unknown teacher");
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(unknown).await["detail"], "Teacher not found");

        let teacher = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/teachers",
                Some(json!({"identityId": "user_t1", "email": "grace@example.com"})),
            ))
            .await
            .expect("teacher");
        assert_eq!(teacher.status(), StatusCode::CREATED);
        let teacher_id = read_json(teacher).await["id"].as_str().expect("id").to_string();

        let created = ctx
            .app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/classes",
                Some(json!({
                    "classCode": "BIO", "className": "Biology", "capacity": 5,
                    "teacherEmail": "Grace@example.com"
                })),
            ))
            .await
            .expect("create");
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = read_json(created).await;
        assert_eq!(created["teacherId"], teacher_id.as_str());

        let teacher = ctx
            .store
            .find_teacher_by_email("grace@example.com")
            .await
            .expect("find")
            .expect("teacher");
        assert_eq!(teacher.class_ids, vec![created["id"].as_str().expect("id").to_string()]);
    }
}
