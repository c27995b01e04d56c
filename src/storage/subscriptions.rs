//! Topic subscription flags
//!
//! Client-local only: the subscribed topics are a JSON list kept in the local
//! store. No push subscription is made anywhere.

use serde_json::Value;

use crate::storage::{Result, Storage};

impl Storage {
    /// Topics subscribed on this device; unset or unreadable reads as none.
    ///
    /// Entries that are not strings are dropped, the rest are kept.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let key = &self.config.subscriptions_key;
        let Some(raw) = self.local.get_item(key) else {
            return Vec::new();
        };

        let entries: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Ignoring unreadable subscription list '{}': {}", key, e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(topic) => Some(topic),
                other => {
                    tracing::warn!("Dropping non-string subscription entry: {}", other);
                    None
                }
            })
            .collect()
    }

    pub fn is_subscribed_to_topic(&self, topic: &str) -> bool {
        self.subscribed_topics().iter().any(|t| t == topic)
    }

    /// Record a subscription to `topic`; does nothing if already subscribed
    pub fn subscribe_to_topic(&self, topic: &str) -> Result<()> {
        let mut topics = self.subscribed_topics();
        if topics.iter().any(|t| t == topic) {
            return Ok(());
        }

        topics.push(topic.to_string());
        let json = serde_json::to_string(&topics)?;
        self.local
            .set_item(&self.config.subscriptions_key, &json)
            .inspect_err(|e| tracing::error!("Error saving subscription to {}: {}", topic, e))?;

        tracing::info!("Subscribed to {} (local flag only)", topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::storage::backend::LocalStore;
    use crate::storage::local::FileLocalStore;
    use crate::storage::memory::{MemoryBlobStore, MemoryDocumentStore, MemoryLocalStore};
    use crate::storage::Storage;
    use crate::types::StoreConfig;
    use tempfile::TempDir;

    fn storage_with(local: Arc<dyn LocalStore>) -> Storage {
        Storage::new(
            StoreConfig::default(),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryBlobStore::default()),
            local,
        )
    }

    #[test]
    fn test_subscribe_then_query() {
        let storage = storage_with(Arc::new(MemoryLocalStore::new()));
        assert!(!storage.is_subscribed_to_topic("year-2024"));

        storage.subscribe_to_topic("year-2024").unwrap();
        assert!(storage.is_subscribed_to_topic("year-2024"));
        assert!(!storage.is_subscribed_to_topic("year-2025"));
    }

    #[test]
    fn test_subscribing_twice_keeps_one_entry() {
        let local = Arc::new(MemoryLocalStore::new());
        let storage = storage_with(local.clone());

        storage.subscribe_to_topic("news").unwrap();
        storage.subscribe_to_topic("news").unwrap();

        assert_eq!(local.get_item("med_app_subs").as_deref(), Some(r#"["news"]"#));
        assert_eq!(storage.subscribed_topics(), vec!["news".to_string()]);
    }

    #[test]
    fn test_unreadable_list_is_treated_as_empty() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set_item("med_app_subs", "not a list").unwrap();
        let storage = storage_with(local);

        assert!(!storage.is_subscribed_to_topic("news"));
        storage.subscribe_to_topic("news").unwrap();
        assert_eq!(storage.subscribed_topics(), vec!["news".to_string()]);
    }

    #[test]
    fn test_non_string_entries_do_not_discard_topics() {
        let local = Arc::new(MemoryLocalStore::new());
        local.set_item("med_app_subs", r#"["news", 7, null, "alerts"]"#).unwrap();
        let storage = storage_with(local.clone());

        assert!(storage.is_subscribed_to_topic("news"));
        assert!(storage.is_subscribed_to_topic("alerts"));

        storage.subscribe_to_topic("labs").unwrap();
        assert_eq!(
            local.get_item("med_app_subs").as_deref(),
            Some(r#"["news","alerts","labs"]"#)
        );
    }

    #[test]
    fn test_subscriptions_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_store.json");

        storage_with(Arc::new(FileLocalStore::new(&path)))
            .subscribe_to_topic("alerts")
            .unwrap();

        let reopened = storage_with(Arc::new(FileLocalStore::new(&path)));
        assert!(reopened.is_subscribed_to_topic("alerts"));
    }
}
