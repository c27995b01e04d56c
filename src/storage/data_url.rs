//! Embedded data URLs
//!
//! Parses `data:[<media type>][;base64],<payload>` strings into their media
//! type and decoded bytes.

use base64::Engine;

use crate::storage::{Result, StorageError};
use crate::types::sheet::DATA_URL_PREFIX;

/// Media type assumed when a data URL omits one
const DEFAULT_MEDIA_TYPE: &str = "text/plain;charset=US-ASCII";

/// A decoded data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| StorageError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| StorageError::InvalidDataUrl("missing ',' separator".to_string()))?;

        let (media_type, is_base64) = match header.strip_suffix(";base64") {
            Some(media_type) => (media_type, true),
            None => (header, false),
        };

        let media_type = if media_type.trim().is_empty() {
            DEFAULT_MEDIA_TYPE.to_string()
        } else {
            media_type.trim().to_string()
        };

        let bytes = if is_base64 {
            // Payloads copied out of URLs sometimes carry whitespace
            let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD.decode(cleaned)?
        } else {
            urlencoding::decode_binary(payload.as_bytes()).into_owned()
        };

        Ok(Self { media_type, bytes })
    }

    /// Media type without parameters, e.g. `image/png`
    pub fn mime_essence(&self) -> &str {
        self.media_type
            .split(';')
            .next()
            .unwrap_or(&self.media_type)
            .trim()
    }
}
