//! Persistence seam for aggregates.
//!
//! [`Repository`] is what services consume. [`StorageRepository`] implements
//! it on top of any [`KeyValueStorage`] by storing JSON snapshots under a key
//! prefix, and [`InMemoryStorage`] is the process-local storage backend.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::aggregate::Aggregate;

/// Errors that can occur when loading or storing aggregates.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No entity is stored under the id.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// A new entity was saved under an id that is already taken.
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    /// The stored entity changed since it was loaded.
    #[error("Concurrency conflict for {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot decoded but describes an invalid entity.
    #[error("Corrupted snapshot: {0}")]
    Corrupted(String),
}

/// Aggregates that can be stored as JSON snapshots.
pub trait Persistable: Aggregate + Sized + Send + Sync {
    fn version(&self) -> u64;

    fn to_json(&self) -> Result<Value, serde_json::Error>;

    fn from_json(value: Value) -> Result<Self, RepositoryError>;

    /// Version the entity had when loaded, `None` if it was never stored.
    fn loaded_version(&self) -> Option<u64> {
        self.root().loaded_version()
    }
}

/// Equality filter over top-level snapshot fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryFilter {
    fields: Map<String, Value>,
}

impl RepositoryFilter {
    /// Filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the snapshot field `key` to equal `value`.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, snapshot: &Value) -> bool {
        self.fields
            .iter()
            .all(|(key, expected)| snapshot.get(key) == Some(expected))
    }
}

/// Asynchronous repository consumed by the services.
#[async_trait]
pub trait Repository<T>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError>;

    /// Stores the entity, rejecting stale versions.
    async fn save(&self, entity: &T) -> Result<(), RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    async fn find_all(&self, filter: &RepositoryFilter) -> Result<Vec<T>, RepositoryError>;
}

#[async_trait]
impl<T, R> Repository<T> for Arc<R>
where
    T: Send + Sync + 'static,
    R: Repository<T> + ?Sized,
{
    async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn save(&self, entity: &T) -> Result<(), RepositoryError> {
        (**self).save(entity).await
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }

    async fn find_all(&self, filter: &RepositoryFilter) -> Result<Vec<T>, RepositoryError> {
        (**self).find_all(filter).await
    }
}

/// String key-value storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;

    async fn set(&self, key: &str, value: String) -> Result<(), RepositoryError>;

    /// Removes a key, returning whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, RepositoryError>;

    /// Keys starting with `prefix`, in lexical order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError>;
}

/// In-memory key-value storage.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a storage error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("storage is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStorage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Repository storing `to_json` snapshots in a [`KeyValueStorage`] under
/// `"{prefix}:{id}"`.
pub struct StorageRepository<T, S> {
    storage: S,
    prefix: String,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, S> StorageRepository<T, S>
where
    T: Persistable,
    S: KeyValueStorage,
{
    pub fn new(storage: S, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            _phantom: PhantomData,
        }
    }

    /// Repository keyed by the aggregate type name.
    pub fn for_aggregate(storage: S) -> Self {
        Self::new(storage, T::aggregate_type())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{id}", self.prefix)
    }

    async fn load_snapshot(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        match self.storage.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<T, S> Repository<T> for StorageRepository<T, S>
where
    T: Persistable + 'static,
    S: KeyValueStorage,
{
    async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError> {
        let snapshot = self
            .load_snapshot(&self.key(id))
            .await?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        T::from_json(snapshot)
    }

    async fn save(&self, entity: &T) -> Result<(), RepositoryError> {
        let id = entity.id().to_string();
        let key = self.key(&id);

        if let Some(stored) = self.load_snapshot(&key).await? {
            let actual = stored.get("version").and_then(Value::as_u64).unwrap_or(0);
            match entity.loaded_version() {
                None => return Err(RepositoryError::AlreadyExists(id)),
                Some(expected) if expected != actual => {
                    return Err(RepositoryError::ConcurrencyConflict {
                        id,
                        expected,
                        actual,
                    });
                }
                Some(_) => {}
            }
        }

        let snapshot = serde_json::to_string(&entity.to_json()?)?;
        self.storage.set(&key, snapshot).await?;
        tracing::debug!(key = %key, version = entity.version(), "snapshot saved");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        if self.storage.remove(&self.key(id)).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(id.to_string()))
        }
    }

    async fn find_all(&self, filter: &RepositoryFilter) -> Result<Vec<T>, RepositoryError> {
        let prefix = format!("{}:", self.prefix);
        let mut entities = Vec::new();

        for key in self.storage.keys(&prefix).await? {
            let Some(snapshot) = self.load_snapshot(&key).await? else {
                continue;
            };
            if filter.matches(&snapshot) {
                entities.push(T::from_json(snapshot)?);
            }
        }

        Ok(entities)
    }
}
