use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{self, ObjectKeys, SharedStore, StorageError};

/// Credential record persisted as `users/{email}.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum UserStoreError {
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// User records in object storage, one JSON object per email.
///
/// There is no conditional write: two concurrent signups for the same email
/// can both pass the existence check, and the later write wins.
#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
    keys: ObjectKeys,
}

impl UserService {
    pub fn new(store: SharedStore, keys: ObjectKeys) -> Self {
        Self { store, keys }
    }

    pub async fn find(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        match storage::get_json(self.store.as_ref(), &self.keys.user(email)).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, email: &str) -> Result<bool, UserStoreError> {
        Ok(self.find(email).await?.is_some())
    }

    pub async fn create(&self, email: &str, password_hash: String) -> Result<UserRecord, UserStoreError> {
        if self.exists(email).await? {
            return Err(UserStoreError::AlreadyExists(email.to_string()));
        }

        let record = UserRecord {
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        storage::put_json(self.store.as_ref(), &self.keys.user(email), &record).await?;

        tracing::info!("Created user {}", email);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ObjectStore};
    use std::sync::Arc;

    fn service(prefix: &str) -> (Arc<MemoryStore>, UserService) {
        let store = Arc::new(MemoryStore::new());
        let users = UserService::new(store.clone(), ObjectKeys::new(prefix));
        (store, users)
    }

    #[tokio::test]
    async fn create_then_find() {
        let (store, users) = service("");
        let created = users.create("analyst@agency.gov", "hash".into()).await.unwrap();

        assert!(store.contains("users/analyst@agency.gov.json").await);
        let found = users.find("analyst@agency.gov").await.unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (_, users) = service("");
        users.create("dup@agency.gov", "h1".into()).await.unwrap();

        let err = users.create("dup@agency.gov", "h2".into()).await.unwrap_err();
        assert!(matches!(err, UserStoreError::AlreadyExists(email) if email == "dup@agency.gov"));
        assert_eq!(users.find("dup@agency.gov").await.unwrap().unwrap().password_hash, "h1");
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let (_, users) = service("");
        assert!(users.find("ghost@agency.gov").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn prefix_is_applied() {
        let (store, users) = service("staging/");
        users.create("a@b.gov", "h".into()).await.unwrap();
        assert!(store.contains("staging/users/a@b.gov.json").await);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_storage_error() {
        let (store, users) = service("");
        store.put("users/bad@b.gov.json", b"not json".to_vec(), "application/json").await.unwrap();
        assert!(matches!(users.find("bad@b.gov").await, Err(UserStoreError::Storage(_))));
    }
}
