//! Persisted cache entry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EntryError;

/// The unit written to the store for a cacheable response.
///
/// Only the validator and policy-supplied properties are stored; the
/// response body never is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Entity tag in header form, e.g. `"abc"`.
    pub etag: String,
    /// Opaque properties contributed by policies.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_properties: Map<String, Value>,
}

impl CacheEntry {
    /// Create an entry with no extra properties.
    pub fn new(etag: impl Into<String>) -> Self {
        Self {
            etag: etag.into(),
            extra_properties: Map::new(),
        }
    }

    /// Attach extra properties.
    pub fn with_extra_properties(mut self, extra_properties: Map<String, Value>) -> Self {
        self.extra_properties = extra_properties;
        self
    }

    /// Serialize for the store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EntryError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize bytes read from the store.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EntryError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
