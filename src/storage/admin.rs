//! Admin password setting
//!
//! Stored as the `passwordHash` field of the `settings/admin` document.

use serde_json::{Map, Value};

use crate::storage::{Result, Storage};

pub const SETTINGS_COLLECTION: &str = "settings";
pub const ADMIN_DOCUMENT: &str = "admin";
const PASSWORD_FIELD: &str = "passwordHash";

impl Storage {
    /// Stored admin password, or the configured default when none is stored.
    ///
    /// Read failures are logged and yield the default as well.
    pub async fn get_admin_password(&self) -> String {
        match self.documents.get(SETTINGS_COLLECTION, ADMIN_DOCUMENT).await {
            Ok(Some(doc)) => match doc.get(PASSWORD_FIELD).and_then(Value::as_str) {
                Some(password) => return password.to_string(),
                None => tracing::warn!("Admin settings have no '{}' field", PASSWORD_FIELD),
            },
            Ok(None) => tracing::debug!("No admin settings stored, using default password"),
            Err(e) => tracing::error!("Error fetching admin password: {}", e),
        }
        self.config.default_admin_password.clone()
    }

    /// Store a new admin password, leaving other admin settings untouched
    pub async fn set_admin_password(&self, new_password: &str) -> Result<()> {
        let mut fields = Map::new();
        fields.insert(PASSWORD_FIELD.to_string(), Value::from(new_password));

        self.documents
            .merge(SETTINGS_COLLECTION, ADMIN_DOCUMENT, fields)
            .await
            .inspect_err(|e| tracing::error!("Error setting admin password: {}", e))?;

        tracing::info!("Admin password updated");
        Ok(())
    }

    /// Whether `candidate` matches the current admin password
    pub async fn verify_admin_password(&self, candidate: &str) -> bool {
        self.get_admin_password().await == candidate
    }
}
