//! In-memory backends
//!
//! Process-local implementations of the backend traits with the same
//! semantics as the hosted services. Used for offline runs and tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::storage::backend::{BlobStore, Document, DocumentStore, LocalStore};
use crate::storage::data_url::DataUrl;
use crate::storage::{Result, StorageError};

/// Documents keyed by `(collection, id)`
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<(String, String), Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, id: &str) -> (String, String) {
        (collection.to_string(), id.to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .get(&Self::key(collection, id))
            .map(|doc| doc.value().clone()))
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.documents.insert(Self::key(collection, id), document);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut doc = self.documents.entry(Self::key(collection, id)).or_default();
        doc.extend(fields);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        match self.documents.get_mut(&Self::key(collection, id)) {
            Some(mut doc) => {
                doc.extend(fields);
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("{}/{}", collection, id))),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.documents.remove(&Self::key(collection, id));
        Ok(())
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let mut doc = self.documents.entry(Self::key(collection, id)).or_default();
        let slot = doc.entry(field.to_string()).or_insert(Value::Null);
        // A non-array field is replaced, as the hosted store does
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            for value in values {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
        }
        Ok(())
    }
}

struct StoredBlob {
    content_type: String,
    bytes: Vec<u8>,
    generation: u64,
}

/// Blobs keyed by path
pub struct MemoryBlobStore {
    base_url: String,
    blobs: DashMap<String, StoredBlob>,
    generation: AtomicU64,
    operations: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: DashMap::new(),
            generation: AtomicU64::new(0),
            operations: AtomicUsize::new(0),
        }
    }

    /// Number of calls received, successful or not
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Stored content type and bytes for `path`
    pub fn blob(&self, path: &str) -> Option<(String, Vec<u8>)> {
        self.blobs
            .get(path)
            .map(|blob| (blob.content_type.clone(), blob.bytes.clone()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.contains_key(path)
    }

    fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload_data_url(&self, path: &str, data_url: &DataUrl) -> Result<()> {
        self.record_operation();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.blobs.insert(
            path.to_string(),
            StoredBlob {
                content_type: data_url.mime_essence().to_string(),
                bytes: data_url.bytes.clone(),
                generation,
            },
        );
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        self.record_operation();
        let blob = self
            .blobs
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(format!("{}/{}?v={}", self.base_url, path, blob.generation))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record_operation();
        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

/// String values keyed by name
#[derive(Default)]
pub struct MemoryLocalStore {
    items: DashMap<String, String>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|v| v.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
