//! Sheet repository
//!
//! Sheets live one per document in the `sheets` collection, keyed by sheet id.
//! Their images live in the blob store at `sheets/{id}`.

use serde_json::Value;

use crate::storage::backend::Document;
use crate::storage::data_url::DataUrl;
use crate::storage::{Result, Storage, StorageError};
use crate::types::Sheet;

pub const SHEETS_COLLECTION: &str = "sheets";

/// Blob path holding the image of sheet `id`
pub fn blob_path_for(id: &str) -> String {
    format!("{}/{}", SHEETS_COLLECTION, id)
}

fn to_document(sheet: &Sheet) -> Result<Document> {
    match serde_json::to_value(sheet)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StorageError::InvalidResponse(format!(
            "sheet did not serialize to an object: {}",
            other
        ))),
    }
}

impl Storage {
    /// Every stored sheet, newest first.
    ///
    /// Failures are logged and yield an empty list. Documents that do not
    /// decode as sheets are skipped.
    pub async fn get_sheets(&self) -> Vec<Sheet> {
        let documents = match self.documents.list(SHEETS_COLLECTION).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::error!("Error fetching sheets: {}", e);
                return Vec::new();
            }
        };

        let mut sheets: Vec<Sheet> = documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(Value::Object(doc)) {
                Ok(sheet) => Some(sheet),
                Err(e) => {
                    tracing::warn!("Skipping malformed sheet document: {}", e);
                    None
                }
            })
            .collect();

        sheets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!("Fetched {} sheets", sheets.len());
        sheets
    }

    /// Store a new sheet, uploading its image first when it is embedded.
    ///
    /// The full record replaces whatever is stored under the sheet's id.
    pub async fn add_sheet(&self, sheet: &mut Sheet) -> Result<()> {
        self.write_sheet(sheet, false)
            .await
            .inspect_err(|e| tracing::error!("Error adding sheet: {}", e))?;
        tracing::info!("Added sheet {}", sheet.id);
        Ok(())
    }

    /// Update an existing sheet's fields, re-uploading the image only when it
    /// holds fresh embedded data
    pub async fn update_sheet(&self, sheet: &mut Sheet) -> Result<()> {
        self.write_sheet(sheet, true)
            .await
            .inspect_err(|e| tracing::error!("Error updating sheet: {}", e))?;
        tracing::info!("Updated sheet {}", sheet.id);
        Ok(())
    }

    /// Delete a sheet document, then make a best-effort attempt at its image.
    ///
    /// The image is only touched when a non-empty `image_url` is given, and
    /// always at the path derived from `id`.
    pub async fn delete_sheet(&self, id: &str, image_url: Option<&str>) -> Result<()> {
        self.documents
            .delete(SHEETS_COLLECTION, id)
            .await
            .inspect_err(|e| tracing::error!("Error deleting sheet: {}", e))?;

        if image_url.is_some_and(|url| !url.is_empty()) {
            if let Err(e) = self.blobs.delete(&blob_path_for(id)).await {
                tracing::warn!("Could not delete image or image did not exist: {}", e);
            }
        }

        tracing::info!("Deleted sheet {}", id);
        Ok(())
    }

    async fn write_sheet(&self, sheet: &mut Sheet, partial: bool) -> Result<()> {
        self.persist_embedded_image(sheet).await?;

        let document = to_document(sheet)?;
        if partial {
            self.documents
                .update(SHEETS_COLLECTION, &sheet.id, document)
                .await
        } else {
            self.documents.set(SHEETS_COLLECTION, &sheet.id, document).await
        }
    }

    /// Upload an embedded image and point the sheet at the uploaded blob.
    /// A blob uploaded here stays behind if the document write that follows fails.
    async fn persist_embedded_image(&self, sheet: &mut Sheet) -> Result<()> {
        let Some(embedded) = sheet.embedded_image() else {
            return Ok(());
        };

        let data_url = DataUrl::parse(embedded)?;
        let path = blob_path_for(&sheet.id);

        self.blobs.upload_data_url(&path, &data_url).await?;
        let url = self.blobs.download_url(&path).await?;

        tracing::debug!("Uploaded image for sheet {} ({} bytes)", sheet.id, data_url.bytes.len());
        sheet.image_url = Some(url);
        Ok(())
    }
}
