//! Remote write gateway
//!
//! Optional REST backend mirroring the local collections. Every failure
//! (transport, timeout, non-success status) is reported as an `Err`; the
//! list controller decides how to fall back.

pub mod http;

pub use http::HttpGateway;

use crate::database::RecordId;
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Remote collection a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Items,
    Loans,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Resource::Items => "/items",
            Resource::Loans => "/loans",
        }
    }

    /// Human label used in notices
    pub fn label(self) -> &'static str {
        match self {
            Resource::Items => "Item",
            Resource::Loans => "Peminjaman",
        }
    }
}

/// Server-assigned fields returned by a successful write
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteAck {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub qr_url: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn create(&self, resource: Resource, body: Value) -> Result<RemoteAck>;

    async fn update(&self, resource: Resource, id: &RecordId, body: Value) -> Result<RemoteAck>;

    async fn delete(&self, resource: Resource, id: &RecordId) -> Result<()>;

    /// Full remote collection as raw JSON records
    async fn list(&self, resource: Resource) -> Result<Vec<Value>>;

    /// Look up one item by its code
    async fn find_by_code(&self, code: &str) -> Result<Option<Value>>;
}
