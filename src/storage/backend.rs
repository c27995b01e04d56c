//! Backend traits
//!
//! The document database, blob store and local key-value store are external
//! services. Each is reached through one of these traits so that the hosted
//! adapters and the in-memory ones are interchangeable.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::storage::data_url::DataUrl;
use crate::storage::Result;

/// A document's top-level fields
pub type Document = Map<String, Value>;

/// Remote document database addressed by `(collection, id)`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in a collection, in no particular order
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// A single document, `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create or fully replace a document
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()>;

    /// Create a document or overwrite only the given fields
    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Overwrite the given fields of an existing document.
    /// Fails with `NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Append the values missing from the array stored in `field`,
    /// creating the document and the field as needed
    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()>;
}

/// Remote blob store addressed by path
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store the payload of an embedded data URL at `path`
    async fn upload_data_url(&self, path: &str, data_url: &DataUrl) -> Result<()>;

    /// Publicly downloadable URL for the blob at `path`
    async fn download_url(&self, path: &str) -> Result<String>;

    async fn delete(&self, path: &str) -> Result<()>;
}

/// Client-local string store
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}
