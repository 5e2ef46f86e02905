use super::*;
use axum::{body, body::Body, http::Request, response::Response};
use shared::protocol::{SubmissionPhase, PROJECTS_COLLECTION};
use storage::Storage;
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let api = ApiContext::new(Arc::new(storage.clone()), 8, Duration::from_millis(20));
    let app = build_router(Arc::new(AppState { api }), 16 * 1024);
    (app, storage)
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn json_request(method: &str, uri: &str, value: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn open(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/sessions"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let snapshot: SessionSnapshot = json_body(response).await;
    snapshot.session_id
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(empty_request("GET", "/healthz"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn landing_and_form_pages_are_served() {
    let (app, _storage) = test_app().await;
    for path in ["/", "/form"] {
        let response = app
            .clone()
            .oneshot(empty_request("GET", path))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn catalog_lists_sections_palettes_and_types() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(empty_request("GET", "/api/catalog"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let catalog: serde_json::Value = json_body(response).await;
    assert_eq!(catalog["sections"].as_array().expect("sections").len(), 8);
    assert_eq!(catalog["palettes"].as_array().expect("palettes").len(), 6);
    assert_eq!(catalog["project_types"][1]["id"], "store-dashboard");
}

#[tokio::test]
async fn full_form_flow_stores_project() {
    let (app, storage) = test_app().await;
    let id = open(&app).await;

    for (field, value) in [
        ("projectName", "Store A"),
        ("projectDescription", "A small shop"),
        ("logoUrl", "https://x/logo.png"),
        ("projectType", "store_dashboard"),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/sessions/{id}/fields/{field}"),
                serde_json::json!({ "value": value }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{field}");
    }

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/sessions/{id}/nav-links/0"),
            serde_json::json!({ "field": "title", "value": "Home" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request(
            "POST",
            &format!("/api/sessions/{id}/sections/contact"),
        ))
        .await
        .expect("response");
    let toggled: ToggleSectionResponse = json_body(response).await;
    assert!(toggled.selected);

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/sessions/{id}/submit")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let submitted: SubmitResponse = json_body(response).await;
    assert!(matches!(submitted.phase, SubmissionPhase::Success { .. }));

    let stored = storage
        .load_record(PROJECTS_COLLECTION, &submitted.record_id)
        .await
        .expect("load")
        .expect("stored");
    assert_eq!(stored.record.project_type.as_str(), "store-dashboard");
    // a title without a url is not exported
    assert!(stored.record.nav_links.is_empty());
}

#[tokio::test]
async fn submit_without_required_fields_is_unprocessable() {
    let (app, storage) = test_app().await;
    let id = open(&app).await;

    let response = app
        .oneshot(empty_request("POST", &format!("/api/sessions/{id}/submit")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ApiError = json_body(response).await;
    assert!(matches!(err.code, ErrorCode::Validation));
    assert_eq!(err.errors.len(), 3);
    assert_eq!(
        storage.count_records(PROJECTS_COLLECTION).await.expect("count"),
        0
    );
}

#[tokio::test]
async fn removing_last_nav_link_is_bad_request() {
    let (app, _storage) = test_app().await;
    let id = open(&app).await;

    let response = app
        .oneshot(empty_request(
            "DELETE",
            &format!("/api/sessions/{id}/nav-links/0"),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn closed_session_is_gone() {
    let (app, _storage) = test_app().await;
    let id = open(&app).await;

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/sessions/{id}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(empty_request("GET", &format!("/api/sessions/{id}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _storage) = test_app().await;
    let id = open(&app).await;

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/sessions/{id}/fields/projectDescription"),
            serde_json::json!({ "value": "x".repeat(32 * 1024) }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

struct UnreachableStore;

#[async_trait::async_trait]
impl storage::DocumentStore for UnreachableStore {
    async fn create_record(
        &self,
        _collection: &str,
        _record: &shared::protocol::SubmittedProject,
    ) -> Result<shared::protocol::CreatedRecord, storage::WriteError> {
        Err(storage::WriteError::Unavailable("connection reset".into()))
    }
}

#[tokio::test]
async fn failed_submit_is_acknowledged_back_to_idle() {
    let api = ApiContext::new(Arc::new(UnreachableStore), 8, Duration::from_millis(20));
    let app = build_router(Arc::new(AppState { api }), 16 * 1024);
    let id = open(&app).await;
    for (field, value) in [
        ("projectName", "Store A"),
        ("projectDescription", "A small shop"),
        ("logoUrl", "https://x/logo.png"),
    ] {
        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/sessions/{id}/fields/{field}"),
                serde_json::json!({ "value": value }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/sessions/{id}/submit")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let err: ApiError = json_body(response).await;
    assert!(err.message.contains("connection reset"));

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/sessions/{id}/acknowledge")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: SessionSnapshot = json_body(response).await;
    assert_eq!(snapshot.form.phase, SubmissionPhase::Idle);
    assert_eq!(snapshot.form.draft.project_name, "Store A");
    assert!(snapshot.form.submit_enabled);
}

#[test]
fn form_page_acknowledges_failures_after_alerting() {
    assert!(pages::FORM_PAGE.contains(r#"api("POST", "/acknowledge")"#));
}
