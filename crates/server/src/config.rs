use std::{fs, path::PathBuf};

use anyhow::Context;
use ::config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;

const CONFIG_FILE: &str = "server.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/wisetwin.db";

/// Variables read before the `APP__` prefix existed, mapped to their keys.
const LEGACY_ENV: [(&str, &str); 2] = [("SERVER_BIND", "bind_addr"), ("DATABASE_URL", "database_url")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Azure,
    Local,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    pub blob_backend: BlobBackend,
    /// Blob service URL of the storage account, e.g.
    /// `https://account.blob.core.windows.net`.
    pub blob_endpoint: Option<String>,
    pub blob_sas_token: Option<String>,
    pub blob_local_root: PathBuf,
    pub blob_container: String,
    pub max_upload_bytes: usize,
}

/// Defaults, then `server.toml`, then legacy variables, then `APP__*`.
pub fn load_settings() -> anyhow::Result<Settings> {
    let file = fs::read_to_string(CONFIG_FILE).ok();
    settings_from(file.as_deref(), std::env::vars().collect())
}

pub(crate) fn settings_from(file: Option<&str>, env: Map<String, String>) -> anyhow::Result<Settings> {
    let mut legacy = Config::builder();
    for (variable, key) in LEGACY_ENV {
        if let Some(value) = env.get(variable) {
            legacy = legacy.set_override(key, value.as_str())?;
        }
    }

    let mut builder = Config::builder()
        .set_default("bind_addr", "127.0.0.1:8080")?
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("blob_backend", "local")?
        .set_default("blob_local_root", "./data/blobs")?
        .set_default("blob_container", "builds")?
        .set_default("max_upload_bytes", 512_i64 * 1024 * 1024)?;
    if let Some(raw) = file {
        builder = builder.add_source(File::from_str(raw, FileFormat::Toml));
    }

    let settings = builder
        .add_source(legacy.build()?)
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true)
                .source(Some(env)),
        )
        .build()
        .context("failed to assemble server settings")?
        .try_deserialize::<Settings>()
        .context("invalid server settings")?;
    Ok(settings)
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    ensure_parent_dir_exists(&database_url)?;
    Ok(database_url)
}

/// Turns plain paths into sqlite URLs. Windows drive paths keep the single
/// colon form sqlx expects.
pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }
    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    let path = if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        path
    } else if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        path
    } else if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    } else {
        raw_database_url
    };

    let path = path.replace('\\', "/");
    if has_drive_letter(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn ensure_parent_dir_exists(database_url: &str) -> anyhow::Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
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
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
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

    Some(PathBuf::from(path))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
