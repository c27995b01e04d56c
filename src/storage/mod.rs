//! Persistent storage
//!
//! This module is the access layer between application code and the remote
//! document database, the remote blob store and the local key-value store.
//! Backends are created once and shared by every operation through [`Storage`].

pub mod admin;
pub mod backend;
pub mod blob;
pub mod data_url;
pub mod firestore;
pub mod ids;
pub mod local;
pub mod memory;
pub mod settings;
pub mod sheets;
pub mod subjects;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use once_cell::sync::OnceCell;
use serde_json::Value;
use thiserror::Error;

use crate::types::StoreConfig;
use backend::{BlobStore, DocumentStore, LocalStore};
use blob::FirebaseBlobStore;
use firestore::FirestoreStore;
use local::FileLocalStore;
use memory::{MemoryBlobStore, MemoryDocumentStore, MemoryLocalStore};

pub use ids::generate_id;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Could not determine data directory")]
    NoDataDir,
    #[error("Storage has not been initialized")]
    NotInitialized,
    #[error("Storage is already initialized")]
    AlreadyInitialized,
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "medsheets")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::NoDataDir)
}

/// Turn a non-success response into a `Server` error, keeping the API's message
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| {
            body.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(text);

    Err(StorageError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Handle to every backend the storage operations talk to
#[derive(Clone)]
pub struct Storage {
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) local: Arc<dyn LocalStore>,
    pub(crate) config: StoreConfig,
}

impl Storage {
    pub fn new(
        config: StoreConfig,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        local: Arc<dyn LocalStore>,
    ) -> Self {
        Self {
            documents,
            blobs,
            local,
            config,
        }
    }

    /// Connect to the hosted backends described by `config`, keeping the
    /// local store in the data directory
    pub fn connect(config: StoreConfig) -> Result<Self> {
        let documents = FirestoreStore::new(&config)?;
        let blobs = FirebaseBlobStore::new(&config)?;
        let local = FileLocalStore::new(get_data_dir()?.join(local::LOCAL_STORE_FILE));

        tracing::info!(
            "Storage connected (project: {}, bucket: {})",
            config.project_id,
            config.storage_bucket
        );

        Ok(Self::new(
            config,
            Arc::new(documents),
            Arc::new(blobs),
            Arc::new(local),
        ))
    }

    /// Storage backed entirely by process memory
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryBlobStore::default()),
            Arc::new(MemoryLocalStore::new()),
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

static STORAGE: OnceCell<Storage> = OnceCell::new();

/// Install the process-wide storage handle. Only the first call succeeds.
pub fn init(storage: Storage) -> Result<&'static Storage> {
    STORAGE
        .set(storage)
        .map_err(|_| StorageError::AlreadyInitialized)?;
    global()
}

/// The process-wide storage handle installed by [`init`]
pub fn global() -> Result<&'static Storage> {
    STORAGE.get().ok_or(StorageError::NotInitialized)
}
