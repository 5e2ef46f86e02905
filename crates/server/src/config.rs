use std::path::Path;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use storage::{StoreBackend, StoreConfig};

pub const SETTINGS_FILE: &str = "intake.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub success_delay_ms: u64,
    pub max_open_sessions: usize,
    pub max_body_bytes: usize,
    pub session_idle_timeout_secs: u64,
    pub store: StoreConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            success_delay_ms: 2000,
            max_open_sessions: 256,
            max_body_bytes: 64 * 1024,
            session_idle_timeout_secs: 30 * 60,
            store: StoreConfig::default(),
        }
    }
}

/// Defaults, then `intake.toml` if present, then `APP__*` environment
/// variables (`APP__STORE__DATABASE_URL` sets `store.database_url`).
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let mut settings: Settings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read settings from '{}'", path.display()))?
        .try_deserialize()
        .context("invalid settings")?;

    if settings.store.backend == StoreBackend::Sqlite {
        settings.store.database_url = normalize_database_url(&settings.store.database_url);
    }
    Ok(settings)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return StoreConfig::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        let path = path.replace('\\', "/");
        if is_windows_drive_path(&path) {
            return format!("sqlite:{path}");
        }
        return format!("sqlite://{path}");
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return sqlite_url_for_path(path);
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    sqlite_url_for_path(raw_database_url)
}

fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if is_windows_drive_path(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
