//! Storage module
//!
//! Local persistence for reading state. Values are JSON documents stored
//! under string keys in a [`KeyValueStore`] backend, the same shape browser
//! local storage gives a web client.
//!
//! [`LocalStorage::load`] never fails: a missing key yields the default, and
//! a value that no longer parses is replaced by the default on the spot.
//!
//! There is no cross-process locking. Two readers sharing one data
//! directory can overwrite each other's collection writes (last write wins).

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// String key/value backend
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Typed JSON access over a key/value backend
#[derive(Clone)]
pub struct LocalStorage {
    backend: Arc<dyn KeyValueStore>,
}

impl LocalStorage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Storage that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Load the value stored under `key`, or `default`.
    ///
    /// Unparsable values are logged, overwritten with `default` and
    /// `default` is returned.
    pub async fn load<T>(&self, key: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let raw = match self.backend.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!("Failed to read local storage key {:?}: {}", key, e);
                return default;
            }
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    "Stored value for {:?} is malformed ({}), resetting to default",
                    key,
                    e
                );
                if let Err(e) = self.save(key, &default).await {
                    tracing::error!("Failed to reset local storage key {:?}: {}", key, e);
                }
                default
            }
        }
    }

    /// Serialize `value` and store it under `key`, replacing what was there
    pub async fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value)?;
        self.backend.set_item(key, &json).await?;
        tracing::debug!("Saved local storage key {:?} ({} bytes)", key, json.len());
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        self.backend.remove_item(key).await
    }

    /// Raw stored string, bypassing JSON decoding
    pub async fn raw(&self, key: &str) -> Result<Option<String>> {
        self.backend.get_item(key).await
    }
}
