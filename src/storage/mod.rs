//! Object storage used as the service's only persistence layer.
//!
//! Three logical prefixes live in one bucket: `users/` holds one credential
//! record per email, `metadata/` holds curated dataset descriptions, and
//! `data/` holds the dataset payloads themselves.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod sigv4;
pub mod spaces;

pub use memory::MemoryStore;
pub use spaces::SpacesStore;

use crate::config::SpacesConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("object is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage misconfigured: {0}")]
    Config(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Minimal S3-style object API.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes, or `StorageError::NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Keys under `prefix`, in lexicographic order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

pub type SharedStore = Arc<dyn ObjectStore>;

pub async fn get_json<T: DeserializeOwned>(store: &dyn ObjectStore, key: &str) -> Result<T, StorageError> {
    let bytes = store.get(key).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec(value)?;
    store.put(key, body, "application/json").await
}

/// Builds object keys for the bucket layout, honoring the configured prefix.
#[derive(Debug, Clone, Default)]
pub struct ObjectKeys {
    prefix: String,
}

impl ObjectKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn user(&self, email: &str) -> String {
        format!("{}users/{}.json", self.prefix, email)
    }

    pub fn metadata_prefix(&self) -> String {
        format!("{}metadata/", self.prefix)
    }

    /// Key for a dataset payload. IDs that could escape the `data/` prefix are refused.
    pub fn dataset(&self, id: &str) -> Option<String> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return None;
        }
        Some(format!("{}data/{}.json", self.prefix, id))
    }
}

/// Build the configured store. Returns `None` when credentials are absent (demo mode).
pub fn from_config(config: &SpacesConfig) -> Result<Option<SharedStore>, StorageError> {
    if !config.is_configured() {
        return Ok(None);
    }
    let store = SpacesStore::from_config(config)?;
    Ok(Some(Arc::new(store)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_bucket_layout() {
        let keys = ObjectKeys::new("");
        assert_eq!(keys.user("a@b.gov"), "users/a@b.gov.json");
        assert_eq!(keys.metadata_prefix(), "metadata/");
        assert_eq!(keys.dataset("census-2023").as_deref(), Some("data/census-2023.json"));
    }

    #[test]
    fn prefix_applies_to_every_key() {
        let keys = ObjectKeys::new("staging/");
        assert_eq!(keys.user("a@b.gov"), "staging/users/a@b.gov.json");
        assert_eq!(keys.metadata_prefix(), "staging/metadata/");
        assert_eq!(keys.dataset("x").as_deref(), Some("staging/data/x.json"));
    }

    #[test]
    fn dataset_ids_cannot_escape_prefix() {
        let keys = ObjectKeys::default();
        assert!(keys.dataset("../users/admin@b.gov").is_none());
        assert!(keys.dataset("a/b").is_none());
        assert!(keys.dataset("  ").is_none());
    }

    #[test]
    fn unconfigured_spaces_means_demo_mode() {
        let store = from_config(&SpacesConfig::default()).unwrap();
        assert!(store.is_none());
    }
}
