//! Storage module
//!
//! Key-value persistence for record collections and their view state.
//! Backends implement [`KeyValueStore`]; everything above talks to the
//! typed [`Store`] facade.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::Store;

use crate::database::Repository;
use crate::error::Result;
use async_trait::async_trait;

/// Raw whole-value access to a key-value backend
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read_raw(&self, key: &str) -> Result<Option<String>>;

    async fn write_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Returns whether the key existed
    async fn remove(&self, key: &str) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl KeyValueStore for Repository {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key).await
    }

    async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        self.put_value(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.delete_value(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.list_keys().await
    }
}
