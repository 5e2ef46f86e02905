//! Firestore REST backend.
//!
//! Records are written with a single `documents:commit` call so the document
//! body and its `createdAt` server timestamp land atomically. Ids are
//! generated locally, as the browser SDK's `addDoc` does.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared::protocol::{CreatedRecord, SubmittedProject};
use tracing::{info, warn};
use url::Url;

use crate::{new_document_id, DocumentStore, WriteError};

pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1/";
pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: String,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Upper bound on one commit, connect through response body.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_database_id() -> String {
    DEFAULT_DATABASE_ID.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            database_id: default_database_id(),
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    #[serde(default)]
    commit_time: Option<String>,
}

pub struct FirestoreStore {
    http: Client,
    endpoint: Url,
    config: FirestoreConfig,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.project_id.trim().is_empty(),
            "firestore project_id must not be empty"
        );
        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("invalid firestore endpoint '{}'", config.endpoint))?;
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .context("failed to build firestore http client")?;
        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.config.project_id, self.config.database_id
        )
    }

    fn commit_url(&self) -> Result<Url, url::ParseError> {
        let mut url = self
            .endpoint
            .join(&format!("{}/documents:commit", self.database_path()))?;
        if !self.config.api_key.is_empty() {
            url.query_pairs_mut().append_pair("key", &self.config.api_key);
        }
        Ok(url)
    }

    fn commit_body(
        &self,
        collection: &str,
        id: &str,
        record: &SubmittedProject,
    ) -> Result<Value, WriteError> {
        let Value::Object(document) = serde_json::to_value(record)? else {
            return Err(WriteError::Rejected(
                "record did not encode to a document".into(),
            ));
        };
        let name = format!("{}/documents/{collection}/{id}", self.database_path());
        Ok(json!({
            "writes": [{
                "update": { "name": name, "fields": encode_fields(&document) },
                "currentDocument": { "exists": false },
                "updateTransforms": [{
                    "fieldPath": CREATED_AT_FIELD,
                    "setToServerValue": "REQUEST_TIME"
                }]
            }]
        }))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create_record(
        &self,
        collection: &str,
        record: &SubmittedProject,
    ) -> Result<CreatedRecord, WriteError> {
        let id = new_document_id();
        let body = self.commit_body(collection, &id, record)?;
        let url = self
            .commit_url()
            .map_err(|err| WriteError::Unavailable(format!("invalid commit url: {err}")))?;

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    WriteError::Unavailable(format!(
                        "firestore commit timed out after {} ms",
                        self.config.request_timeout_ms
                    ))
                } else {
                    WriteError::Unavailable(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%collection, %status, "firestore rejected commit");
            return Err(WriteError::Rejected(format!("{status}: {}", detail.trim())));
        }

        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|err| WriteError::Unavailable(format!("malformed commit response: {err}")))?;
        info!(
            %collection,
            %id,
            commit_time = commit.commit_time.as_deref().unwrap_or("unknown"),
            "firestore document created"
        );
        Ok(CreatedRecord { id })
    }
}

/// Encodes a JSON object as a Firestore `fields` map.
pub fn encode_fields(document: &Map<String, Value>) -> Map<String, Value> {
    document
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Encodes one JSON value as a typed Firestore `Value`.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

#[cfg(test)]
#[path = "tests/firestore_tests.rs"]
mod tests;
