//! Custom subject registry
//!
//! One document, `settings/customSubjects`, maps `"{year}_{department}"` keys
//! to the list of subjects added for that year and department.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::storage::admin::SETTINGS_COLLECTION;
use crate::storage::{Result, Storage};

pub const SUBJECTS_DOCUMENT: &str = "customSubjects";

/// Registry key for a year and department
pub fn subject_key(year: &str, department: &str) -> String {
    format!("{}_{}", year, department)
}

impl Storage {
    /// Every registered subject list, keyed by `"{year}_{department}"`.
    ///
    /// Empty when nothing is stored or the read fails.
    pub async fn get_all_custom_subjects(&self) -> BTreeMap<String, Vec<String>> {
        let doc = match self
            .documents
            .get(SETTINGS_COLLECTION, SUBJECTS_DOCUMENT)
            .await
        {
            Ok(Some(doc)) => doc,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                tracing::error!("Error fetching custom subjects: {}", e);
                return BTreeMap::new();
            }
        };

        doc.into_iter()
            .filter_map(|(key, value)| match value {
                Value::Array(items) => {
                    let subjects: Vec<String> = items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect();
                    Some((key, subjects))
                }
                other => {
                    tracing::warn!("Ignoring custom subject entry '{}': {}", key, other);
                    None
                }
            })
            .collect()
    }

    /// Subjects registered for one year and department
    pub async fn custom_subjects_for(&self, year: &str, department: &str) -> Vec<String> {
        self.get_all_custom_subjects()
            .await
            .remove(&subject_key(year, department))
            .unwrap_or_default()
    }

    /// Register a subject, keeping each subject at most once per key
    pub async fn add_custom_subject(
        &self,
        year: &str,
        department: &str,
        subject: &str,
    ) -> Result<()> {
        let key = subject_key(year, department);

        self.documents
            .array_union(
                SETTINGS_COLLECTION,
                SUBJECTS_DOCUMENT,
                &key,
                vec![Value::from(subject)],
            )
            .await
            .inspect_err(|e| tracing::error!("Error adding custom subject: {}", e))?;

        tracing::info!("Added custom subject '{}' to {}", subject, key);
        Ok(())
    }
}
