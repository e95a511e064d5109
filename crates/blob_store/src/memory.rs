use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{BlobContentHeaders, BlobItem, BlobStore};

#[derive(Debug, Clone)]
pub struct MemoryBlob {
    pub data: Vec<u8>,
    pub headers: BlobContentHeaders,
    pub last_modified: DateTime<Utc>,
}

/// Process-local store used by tests and by `blob_backend = "memory"`.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<(String, String), MemoryBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, container: &str, name: &str) -> Option<MemoryBlob> {
        self.blobs
            .read()
            .await
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, container: &str) -> Result<Vec<BlobItem>> {
        let blobs = self.blobs.read().await;
        Ok(blobs
            .iter()
            .filter(|((blob_container, _), _)| blob_container == container)
            .map(|((_, name), blob)| BlobItem {
                name: name.clone(),
                size_bytes: blob.data.len() as u64,
                last_modified: Some(blob.last_modified),
            })
            .collect())
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
        headers: BlobContentHeaders,
    ) -> Result<()> {
        self.blobs.write().await.insert(
            (container.to_string(), name.to_string()),
            MemoryBlob {
                data: body,
                headers,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .blobs
            .write()
            .await
            .remove(&(container.to_string(), name.to_string()))
            .is_some())
    }
}
