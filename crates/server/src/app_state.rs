use std::sync::Arc;

use anyhow::Context;
use blob_store::{AzureBlobStore, BlobStore, LocalBlobStore, MemoryBlobStore};
use server_api::ApiContext;

use crate::config::{BlobBackend, Settings};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) max_upload_bytes: usize,
}

pub(crate) fn blob_store_for(settings: &Settings) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match settings.blob_backend {
        BlobBackend::Azure => {
            let endpoint = settings
                .blob_endpoint
                .as_deref()
                .context("blob_endpoint is required for the azure blob backend")?;
            Arc::new(AzureBlobStore::new(endpoint, settings.blob_sas_token.as_deref())?)
        }
        BlobBackend::Local => Arc::new(LocalBlobStore::new(settings.blob_local_root.clone())),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
    };
    Ok(store)
}
