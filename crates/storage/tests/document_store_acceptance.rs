use shared::{
    domain::{NavLink, ProjectType},
    protocol::{CreatedAt, ProjectColors, SubmittedProject, PROJECTS_COLLECTION},
};
use storage::{open_store, DocumentStore, Storage, StoreBackend, StoreConfig};

#[tokio::test]
async fn configured_sqlite_backend_persists_through_trait_object() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("intake_store_acceptance_{suffix}"));
    let database_url = format!(
        "sqlite://{}",
        temp_root
            .join("intake.db")
            .to_string_lossy()
            .replace('\\', "/")
    );

    let config = StoreConfig {
        backend: StoreBackend::Sqlite,
        database_url: database_url.clone(),
        firestore: None,
    };
    let store = open_store(&config).await.expect("open store");

    let record = SubmittedProject {
        project_name: "Acceptance".into(),
        project_description: "written through dyn DocumentStore".into(),
        colors: ProjectColors {
            primary: "#8b5cf6".into(),
            secondary: "#7c3aed".into(),
            accent: "#6d28d9".into(),
        },
        project_type: ProjectType::Store,
        nav_links: vec![NavLink::new("Home", "/")],
        sections: Vec::new(),
        logo_url: "https://example.com/logo.png".into(),
        created_at: CreatedAt::ServerAssigned,
    };
    let created = store
        .create_record(PROJECTS_COLLECTION, &record)
        .await
        .expect("create");
    drop(store);

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let stored = reopened
        .load_record(PROJECTS_COLLECTION, &created.id)
        .await
        .expect("load")
        .expect("stored record");
    assert_eq!(stored.record.project_description, record.project_description);
    assert!(!stored.record.created_at.is_server_assigned());

    drop(reopened);
    std::fs::remove_dir_all(temp_root).expect("cleanup");
}
