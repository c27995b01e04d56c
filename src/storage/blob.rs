//! Firebase Storage REST adapter
//!
//! Implements [`BlobStore`] over the Firebase Storage v0 REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::storage::backend::BlobStore;
use crate::storage::data_url::DataUrl;
use crate::storage::{check_status, Result, StorageError};
use crate::types::StoreConfig;

/// Subset of the object metadata we read back
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Blob store backed by a Firebase Storage bucket
pub struct FirebaseBlobStore {
    client: Client,
    /// `{storage_base_url}/v0/b/{bucket}/o`
    objects_url: String,
    api_key: Option<String>,
}

impl FirebaseBlobStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            objects_url: format!(
                "{}/v0/b/{}/o",
                config.storage_base_url,
                urlencoding::encode(&config.storage_bucket)
            ),
            api_key: config.api_key.clone(),
        })
    }

    /// Object URL; the whole path is one segment, so `/` becomes `%2F`
    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.objects_url, urlencoding::encode(path))
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn metadata(&self, path: &str) -> Result<ObjectMetadata> {
        let request = self.client.get(self.object_url(path));
        let response = self.with_key(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(check_status(response).await?.json().await?)
    }
}

#[async_trait]
impl BlobStore for FirebaseBlobStore {
    async fn upload_data_url(&self, path: &str, data_url: &DataUrl) -> Result<()> {
        let request = self
            .client
            .post(&self.objects_url)
            .query(&[("uploadType", "media"), ("name", path)])
            .header(header::CONTENT_TYPE, data_url.mime_essence())
            .body(data_url.bytes.clone());

        check_status(self.with_key(request).send().await?).await?;
        tracing::debug!("Uploaded {} bytes to '{}'", data_url.bytes.len(), path);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        let metadata = self.metadata(path).await?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
            .ok_or_else(|| {
                StorageError::InvalidResponse(format!("no download token for '{}'", path))
            })?;

        Ok(format!(
            "{}?alt=media&token={}",
            self.object_url(path),
            urlencoding::encode(token)
        ))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self.client.delete(self.object_url(path));
        let response = self.with_key(request).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        check_status(response).await?;
        Ok(())
    }
}
