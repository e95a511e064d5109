use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::{BlobContentHeaders, BlobItem, BlobStore};

/// Stores each container as a directory under `root`. Blob names map to
/// relative file paths.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_dir(&self, container: &str) -> Result<PathBuf> {
        if container.is_empty() || !is_plain_relative(Path::new(container)) || container.contains('/')
        {
            bail!("invalid container name '{container}'");
        }
        Ok(self.root.join(container))
    }

    fn blob_path(&self, container: &str, name: &str) -> Result<PathBuf> {
        if name.is_empty() || !is_plain_relative(Path::new(name)) {
            bail!("invalid blob name '{name}'");
        }
        Ok(self.container_dir(container)?.join(name))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_)))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn list(&self, container: &str) -> Result<Vec<BlobItem>> {
        let base = self.container_dir(container)?;
        let mut items = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to read '{}'", dir.display()))
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                let path = entry.path();
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&base) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                items.push(BlobItem {
                    name,
                    size_bytes: metadata.len(),
                    last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
        _headers: BlobContentHeaders,
    ) -> Result<()> {
        let path = self.blob_path(container, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }

    async fn delete(&self, container: &str, name: &str) -> Result<bool> {
        let path = self.blob_path(container, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("failed to delete '{}'", path.display())),
        }
    }
}

#[cfg(test)]
#[path = "tests/local_tests.rs"]
mod tests;
