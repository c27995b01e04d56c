//! Configuration types
//!
//! Backend endpoints and defaults for the storage layer.

use serde::{Deserialize, Serialize};

/// Credential returned when no admin password has been stored yet
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Local key holding the serialized list of subscribed topics
pub const DEFAULT_SUBSCRIPTIONS_KEY: &str = "med_app_subs";

pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";
pub const DEFAULT_STORAGE_URL: &str = "https://firebasestorage.googleapis.com";

/// Storage layer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Project hosting the document database
    #[serde(default)]
    pub project_id: String,
    /// Web API key, sent with every request when set
    #[serde(default)]
    pub api_key: Option<String>,
    /// Bucket holding sheet images
    #[serde(default)]
    pub storage_bucket: String,
    /// Document database endpoint
    #[serde(default = "default_firestore_url")]
    pub firestore_base_url: String,
    /// Blob store endpoint
    #[serde(default = "default_storage_url")]
    pub storage_base_url: String,
    /// Returned by the admin password read when nothing is stored
    #[serde(default = "default_admin_password")]
    pub default_admin_password: String,
    /// Local key for the topic subscription list
    #[serde(default = "default_subscriptions_key")]
    pub subscriptions_key: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_firestore_url() -> String {
    DEFAULT_FIRESTORE_URL.to_string()
}

fn default_storage_url() -> String {
    DEFAULT_STORAGE_URL.to_string()
}

fn default_admin_password() -> String {
    DEFAULT_ADMIN_PASSWORD.to_string()
}

fn default_subscriptions_key() -> String {
    DEFAULT_SUBSCRIPTIONS_KEY.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: None,
            storage_bucket: String::new(),
            firestore_base_url: default_firestore_url(),
            storage_base_url: default_storage_url(),
            default_admin_password: default_admin_password(),
            subscriptions_key: default_subscriptions_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Normalize values loaded from disk or the environment
    pub fn validate(&mut self) {
        for url in [&mut self.firestore_base_url, &mut self.storage_base_url] {
            while url.ends_with('/') {
                url.pop();
            }
        }

        if self.firestore_base_url.trim().is_empty() {
            self.firestore_base_url = default_firestore_url();
        }
        if self.storage_base_url.trim().is_empty() {
            self.storage_base_url = default_storage_url();
        }

        if self.subscriptions_key.trim().is_empty() {
            self.subscriptions_key = default_subscriptions_key();
        }

        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }

        self.timeout_secs = self.timeout_secs.clamp(1, 600);
    }
}
