//! Backends that always fail, for exercising error policies

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::storage::backend::{BlobStore, Document, DocumentStore};
use crate::storage::data_url::DataUrl;
use crate::storage::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryLocalStore};
use crate::storage::{Result, Storage, StorageError};
use crate::types::StoreConfig;

fn unavailable() -> StorageError {
    StorageError::Server {
        status: 503,
        message: "unavailable".to_string(),
    }
}

pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn list(&self, _: &str) -> Result<Vec<Document>> {
        Err(unavailable())
    }

    async fn get(&self, _: &str, _: &str) -> Result<Option<Document>> {
        Err(unavailable())
    }

    async fn set(&self, _: &str, _: &str, _: Document) -> Result<()> {
        Err(unavailable())
    }

    async fn merge(&self, _: &str, _: &str, _: Document) -> Result<()> {
        Err(unavailable())
    }

    async fn update(&self, _: &str, _: &str, _: Document) -> Result<()> {
        Err(unavailable())
    }

    async fn delete(&self, _: &str, _: &str) -> Result<()> {
        Err(unavailable())
    }

    async fn array_union(&self, _: &str, _: &str, _: &str, _: Vec<Value>) -> Result<()> {
        Err(unavailable())
    }
}

pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload_data_url(&self, _: &str, _: &DataUrl) -> Result<()> {
        Err(unavailable())
    }

    async fn download_url(&self, _: &str) -> Result<String> {
        Err(unavailable())
    }

    async fn delete(&self, _: &str) -> Result<()> {
        Err(unavailable())
    }
}

/// In-memory storage whose blob store stays inspectable
pub fn memory_storage() -> (Storage, Arc<MemoryDocumentStore>, Arc<MemoryBlobStore>) {
    let documents = Arc::new(MemoryDocumentStore::new());
    let blobs = Arc::new(MemoryBlobStore::new("mem://blobs"));
    let storage = Storage::new(
        StoreConfig::default(),
        documents.clone(),
        blobs.clone(),
        Arc::new(MemoryLocalStore::new()),
    );
    (storage, documents, blobs)
}

/// Storage whose document store always fails, with its blob store kept inspectable
pub fn failing_documents() -> (Storage, Arc<MemoryBlobStore>) {
    let blobs = Arc::new(MemoryBlobStore::default());
    let storage = Storage::new(
        StoreConfig::default(),
        Arc::new(FailingDocumentStore),
        blobs.clone(),
        Arc::new(MemoryLocalStore::new()),
    );
    (storage, blobs)
}
