//! Document codec
//!
//! Documents and aggregate rows are stored in their canonical JSON form.

use serde::de::DeserializeOwned;
use serde::Serialize;
use suitestore_core::{Error, Result};

/// Serialize a document or aggregate row
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::unknown("encode document", e))
}

/// Deserialize a stored document or aggregate row
pub fn decode<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::unknown("decode document", e))
}
