use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::protocol::{CreatedAt, CreatedRecord, StoredProject, SubmittedProject};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

pub mod firestore;

pub use firestore::{FirestoreConfig, FirestoreStore};

const DOCUMENT_ID_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const DOCUMENT_ID_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document store rejected the write: {0}")]
    Rejected(String),
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Write path to the hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists `record` into `collection`, stamping it with the store's own
    /// clock, and returns the identifier the store assigned.
    async fn create_record(
        &self,
        collection: &str,
        record: &SubmittedProject,
    ) -> std::result::Result<CreatedRecord, WriteError>;
}

/// 20 alphanumeric characters, the same shape the hosted store uses for
/// auto-generated document ids.
pub fn new_document_id() -> String {
    let mut entropy = Uuid::new_v4().as_u128();
    (0..DOCUMENT_ID_LEN)
        .map(|_| {
            let c = DOCUMENT_ID_ALPHABET[(entropy % 62) as usize] as char;
            entropy /= 62;
            c
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Firestore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub firestore: Option<FirestoreConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            database_url: "sqlite://./data/intake.db".into(),
            firestore: None,
        }
    }
}

/// Opens the configured backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let storage = Storage::new(&config.database_url).await?;
            info!(database_url = %config.database_url, "using sqlite document store");
            Ok(Arc::new(storage))
        }
        StoreBackend::Firestore => {
            let firestore = config
                .firestore
                .clone()
                .context("store.backend is firestore but store.firestore is not configured")?;
            let store = FirestoreStore::new(firestore)?;
            info!(project_id = %store.config().project_id, "using firestore document store");
            Ok(Arc::new(store))
        }
    }
}

/// SQLite-backed document store: one JSON document per row.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn insert_document(
        &self,
        collection: &str,
        body: &str,
    ) -> Result<(String, DateTime<Utc>)> {
        let id = new_document_id();
        let rec = sqlx::query(
            "INSERT INTO documents (id, collection, body) VALUES (?, ?, ?) RETURNING created_at",
        )
        .bind(&id)
        .bind(collection)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert document into '{collection}'"))?;
        let created_at = rec.get::<DateTime<Utc>, _>(0);
        Ok((id, created_at))
    }

    pub async fn load_record(&self, collection: &str, id: &str) -> Result<Option<StoredProject>> {
        let row = sqlx::query(
            "SELECT id, body, created_at FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            decode_stored_project(
                r.get::<String, _>(0),
                &r.get::<String, _>(1),
                r.get::<DateTime<Utc>, _>(2),
            )
        })
        .transpose()
    }

    /// Newest first.
    pub async fn list_records(&self, collection: &str, limit: u32) -> Result<Vec<StoredProject>> {
        let rows = sqlx::query(
            "SELECT id, body, created_at
             FROM documents
             WHERE collection = ?
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )
        .bind(collection)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                decode_stored_project(
                    r.get::<String, _>(0),
                    &r.get::<String, _>(1),
                    r.get::<DateTime<Utc>, _>(2),
                )
            })
            .collect()
    }

    pub async fn count_records(&self, collection: &str) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn decode_stored_project(
    id: String,
    body: &str,
    created_at: DateTime<Utc>,
) -> Result<StoredProject> {
    let mut record: SubmittedProject = serde_json::from_str(body)
        .with_context(|| format!("stored document '{id}' is not a project record"))?;
    record.created_at = CreatedAt::At(created_at);
    Ok(StoredProject { id, record })
}

#[async_trait]
impl DocumentStore for Storage {
    async fn create_record(
        &self,
        collection: &str,
        record: &SubmittedProject,
    ) -> std::result::Result<CreatedRecord, WriteError> {
        let body = serde_json::to_string(record)?;
        let (id, created_at) = self
            .insert_document(collection, &body)
            .await
            .map_err(|err| WriteError::Unavailable(format!("{err:#}")))?;
        debug!(%collection, %id, %created_at, "document stored");
        Ok(CreatedRecord { id })
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
