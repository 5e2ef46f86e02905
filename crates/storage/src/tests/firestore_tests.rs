use super::*;
use axum::{extract::State, http::StatusCode, http::Uri, Json, Router};
use shared::{
    domain::{NavLink, ProjectType, SectionId},
    protocol::{CreatedAt, ProjectColors},
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct FakeFirestore {
    status: StatusCode,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn commit_handler(
    State(fake): State<FakeFirestore>,
    uri: Uri,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.requests.lock().await.push((uri.to_string(), body));
    if fake.status.is_success() {
        (
            fake.status,
            Json(json!({
                "writeResults": [{ "updateTime": "2026-10-19T08:00:00.000001Z" }],
                "commitTime": "2026-10-19T08:00:00.000001Z"
            })),
        )
    } else {
        (
            fake.status,
            Json(json!({ "error": { "code": fake.status.as_u16(), "message": "PERMISSION_DENIED" } })),
        )
    }
}

async fn spawn_fake(status: StatusCode) -> (String, Arc<Mutex<Vec<(String, Value)>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .fallback(commit_handler)
        .with_state(FakeFirestore {
            status,
            requests: requests.clone(),
        });
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}/v1"), requests)
}

fn store_for(endpoint: String) -> FirestoreStore {
    let mut config = FirestoreConfig::new("demo-project", "test-key");
    config.endpoint = endpoint;
    FirestoreStore::new(config).expect("store")
}

fn sample_record() -> SubmittedProject {
    SubmittedProject {
        project_name: "Store A".into(),
        project_description: "desc".into(),
        colors: ProjectColors {
            primary: "#10b981".into(),
            secondary: "#0d9488".into(),
            accent: "#06b6d4".into(),
        },
        project_type: ProjectType::Store,
        nav_links: vec![NavLink::new("Home", "/")],
        sections: vec![SectionId::Hero, SectionId::Contact],
        logo_url: "https://x/logo.png".into(),
        created_at: CreatedAt::ServerAssigned,
    }
}

#[test]
fn encodes_nested_values_as_typed_firestore_values() {
    let encoded = encode_value(&json!({
        "name": "a",
        "count": 3,
        "ratio": 0.5,
        "flag": true,
        "none": null,
        "tags": ["x"],
    }));
    let fields = &encoded["mapValue"]["fields"];
    assert_eq!(fields["name"], json!({ "stringValue": "a" }));
    assert_eq!(fields["count"], json!({ "integerValue": "3" }));
    assert_eq!(fields["ratio"], json!({ "doubleValue": 0.5 }));
    assert_eq!(fields["flag"], json!({ "booleanValue": true }));
    assert_eq!(fields["none"], json!({ "nullValue": null }));
    assert_eq!(
        fields["tags"],
        json!({ "arrayValue": { "values": [{ "stringValue": "x" }] } })
    );
}

#[test]
fn rejects_blank_project_id() {
    assert!(FirestoreStore::new(FirestoreConfig::new("  ", "key")).is_err());
}

#[tokio::test]
async fn create_record_commits_document_with_server_timestamp_transform() {
    let (endpoint, requests) = spawn_fake(StatusCode::OK).await;
    let store = store_for(endpoint);

    let created = store
        .create_record("projects", &sample_record())
        .await
        .expect("create");
    assert_eq!(created.id.len(), 20);

    let requests = requests.lock().await;
    assert_eq!(requests.len(), 1);
    let (uri, body) = &requests[0];
    assert!(
        uri.starts_with("/v1/projects/demo-project/databases/(default)/documents:commit"),
        "unexpected uri {uri}"
    );
    assert!(uri.contains("key=test-key"));

    let write = &body["writes"][0];
    assert_eq!(
        write["update"]["name"],
        format!(
            "projects/demo-project/databases/(default)/documents/projects/{}",
            created.id
        )
    );
    let fields = &write["update"]["fields"];
    assert_eq!(fields["projectName"], json!({ "stringValue": "Store A" }));
    assert_eq!(
        fields["colors"]["mapValue"]["fields"]["primary"],
        json!({ "stringValue": "#10b981" })
    );
    assert!(fields.get("createdAt").is_none());
    assert_eq!(write["currentDocument"], json!({ "exists": false }));
    assert_eq!(
        write["updateTransforms"],
        json!([{ "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }])
    );
}

#[tokio::test]
async fn rejected_commit_maps_to_rejected_write_error() {
    let (endpoint, _requests) = spawn_fake(StatusCode::FORBIDDEN).await;
    let store = store_for(endpoint);

    let err = store
        .create_record("projects", &sample_record())
        .await
        .expect_err("should fail");
    assert!(matches!(err, WriteError::Rejected(ref detail) if detail.contains("403")));
}

#[tokio::test]
async fn unreachable_endpoint_maps_to_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let store = store_for(format!("http://{addr}/v1"));
    let err = store
        .create_record("projects", &sample_record())
        .await
        .expect_err("should fail");
    assert!(matches!(err, WriteError::Unavailable(_)));
}

#[tokio::test]
async fn stalled_commit_times_out_as_unavailable() {
    async fn never_answers() -> StatusCode {
        std::future::pending::<()>().await;
        StatusCode::OK
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, Router::new().fallback(never_answers))
            .await
            .expect("serve");
    });

    let mut config = FirestoreConfig::new("demo-project", "test-key");
    config.endpoint = format!("http://{addr}/v1");
    config.request_timeout_ms = 200;
    let store = FirestoreStore::new(config).expect("store");

    let started = std::time::Instant::now();
    let err = store
        .create_record("projects", &sample_record())
        .await
        .expect_err("should time out");
    assert!(matches!(err, WriteError::Unavailable(ref detail) if detail.contains("timed out")));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[test]
fn timeouts_default_when_missing_from_settings() {
    let config: FirestoreConfig =
        serde_json::from_value(json!({ "project_id": "demo", "api_key": "k" })).expect("config");
    assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
    assert_eq!(config.connect_timeout_ms, DEFAULT_CONNECT_TIMEOUT_MS);
    assert_eq!(config.database_id, DEFAULT_DATABASE_ID);
}
