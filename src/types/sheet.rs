//! Sheet records
//!
//! A sheet is a content record with metadata and an associated image.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Prefix that marks an image field holding an embedded data URL
pub const DATA_URL_PREFIX: &str = "data:";

/// A sheet record as stored in the `sheets` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    /// Unique id, also the document id
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(deserialize_with = "deserialize_millis")]
    pub created_at: i64,
    /// Remote image URL, or an embedded data URL before the sheet is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Remaining metadata, carried through untouched
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Sheet {
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            image_url: None,
            metadata: Map::new(),
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The embedded image payload, if the image field holds a fresh data URL
    pub fn embedded_image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .filter(|url| url.starts_with(DATA_URL_PREFIX))
    }
}

/// Accepts integer or float timestamps; stores written by JavaScript clients
/// may hand back either.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", n))),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        other => Err(serde::de::Error::custom(format!(
            "expected a numeric timestamp, got {}",
            other
        ))),
    }
}
