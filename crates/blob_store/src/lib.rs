use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

mod azure;
pub mod build;
mod local;
pub mod lookup;
mod memory;

pub use azure::AzureBlobStore;
pub use build::{BlobContentHeaders, BuildFile};
pub use local::LocalBlobStore;
pub use lookup::{resolve_build, BuildCandidate};
pub use memory::{MemoryBlob, MemoryBlobStore};

/// One blob as returned by a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Lists every blob of `container`. A missing container lists as empty.
    async fn list(&self, container: &str) -> Result<Vec<BlobItem>>;

    async fn upload(
        &self,
        container: &str,
        name: &str,
        body: Vec<u8>,
        headers: BlobContentHeaders,
    ) -> Result<()>;

    /// Returns `false` when the blob did not exist.
    async fn delete(&self, container: &str, name: &str) -> Result<bool>;
}
