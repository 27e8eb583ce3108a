//! Typed store facade
//!
//! Collections are stored as JSON arrays under their key, view state as a
//! JSON object under `<key>:meta`. Malformed persisted data never becomes
//! an error: a broken value reads as an empty collection and undecodable
//! elements are dropped individually. Backend I/O failures do propagate.

use super::{KeyValueStore, MemoryStore};
use crate::config::meta_key;
use crate::database::{Repository, ViewMeta};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by the SQLite repository
    pub fn sqlite(repo: Repository) -> Self {
        Self::new(Arc::new(repo))
    }

    /// Store backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Read a collection, keeping every element that decodes
    pub async fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.backend.read_raw(key).await? else {
            return Ok(Vec::new());
        };

        let elements = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(elements)) => elements,
            Ok(Value::Null) => return Ok(Vec::new()),
            Ok(other) => {
                tracing::warn!(
                    "Stored value for {} is not a list ({}), treating as empty",
                    key,
                    json_kind(&other)
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::warn!("Corrupted value for {}, treating as empty: {}", key, e);
                return Ok(Vec::new());
            }
        };

        let total = elements.len();
        let records: Vec<T> = elements
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| match serde_json::from_value(element) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping invalid record {} in {}: {}", index, key, e);
                    None
                }
            })
            .collect();

        tracing::debug!("Read {} of {} records from {}", records.len(), total, key);
        Ok(records)
    }

    /// Replace a collection with the given records
    pub async fn write_collection<T: Serialize>(&self, key: &str, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.backend.write_raw(key, &raw).await
    }

    /// Read view state for a collection; anything unreadable is the default
    pub async fn read_meta(&self, key: &str) -> Result<ViewMeta> {
        let meta_key = meta_key(key);
        let Some(raw) = self.backend.read_raw(&meta_key).await? else {
            return Ok(ViewMeta::default());
        };

        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Corrupted view state in {}, using defaults: {}", meta_key, e);
            ViewMeta::default()
        }))
    }

    pub async fn write_meta(&self, key: &str, meta: &ViewMeta) -> Result<()> {
        let raw = serde_json::to_string(meta)?;
        self.backend.write_raw(&meta_key(key), &raw).await
    }

    /// Raw JSON value under a key, `Null` when missing or unparseable
    pub async fn read_value(&self, key: &str) -> Result<Value> {
        let raw = self.backend.read_raw(key).await?;
        Ok(raw
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(Value::Null))
    }

    pub async fn write_value(&self, key: &str, value: &Value) -> Result<()> {
        self.backend.write_raw(key, &value.to_string()).await
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.backend.remove(key).await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.backend.keys().await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
