//! Record types managed by a list controller

use crate::config::{ITEMS_KEY, LOANS_KEY};
use crate::database::{Item, ItemPatch, Loan, LoanPatch, RecordId};
use crate::error::Result;
use crate::gateway::{RemoteAck, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// A collection element with a stable id and a fixed export layout.
///
/// Filtering and sorting work on the serialized form, so column names are
/// the persisted JSON field names (`nama`, `tanggal`, ...).
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Patch: Send + Sync;

    const RESOURCE: Resource;
    const STORAGE_KEY: &'static str;
    /// Column compared as a calendar date when sorting
    const DATE_COLUMN: &'static str;
    /// Whether removals are forwarded to the gateway
    const REMOTE_DELETE: bool;
    const DELETE_PROMPT: &'static str;
    /// Export header, including the leading row number column
    const CSV_HEADERS: &'static [&'static str];

    fn id(&self) -> &RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Export values in `CSV_HEADERS` order, without the row number
    fn csv_fields(&self) -> Vec<String>;

    /// Take over server-assigned fields
    fn merge_ack(&mut self, ack: &RemoteAck);

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Body sent with a remote update
    fn remote_update_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Stringified top-level field values, used for filtering
pub(crate) fn field_texts<R: Record>(record: &R) -> Vec<String> {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => fields.values().map(value_text).collect(),
        _ => Vec::new(),
    }
}

/// Stringified value of one column, empty when absent
pub(crate) fn column_text<R: Record>(record: &R, column: &str) -> String {
    match serde_json::to_value(record) {
        Ok(Value::Object(fields)) => fields.get(column).map(value_text).unwrap_or_default(),
        _ => String::new(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Record for Item {
    type Patch = ItemPatch;

    const RESOURCE: Resource = Resource::Items;
    const STORAGE_KEY: &'static str = ITEMS_KEY;
    const DATE_COLUMN: &'static str = "tanggal";
    const REMOTE_DELETE: bool = false;
    const DELETE_PROMPT: &'static str = "Hapus item ini?";
    const CSV_HEADERS: &'static [&'static str] = &["No", "Nama", "Kondisi", "Jenis", "Tanggal", "Img"];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.condition.as_str().to_string(),
            self.category.clone(),
            self.registered_on.clone(),
            self.image.as_ref().map(|img| img.as_str().to_string()).unwrap_or_default(),
        ]
    }

    fn merge_ack(&mut self, ack: &RemoteAck) {
        if let Some(id) = ack.id.as_ref().filter(|id| !id.is_unassigned()) {
            self.id = id.clone();
        }
        if let Some(url) = &ack.img_url {
            self.image = Some(url.as_str().into());
        }
        if let Some(url) = &ack.qr_url {
            self.qr = Some(url.clone());
        }
    }

    fn apply_patch(&mut self, patch: &ItemPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(condition) = patch.condition {
            self.condition = condition;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(date) = &patch.registered_on {
            self.registered_on = date.clone();
        }
        if let Some(image) = &patch.image {
            self.image = Some(image.clone());
        }
        if let Some(code) = patch.code.as_ref().filter(|c| !c.trim().is_empty()) {
            self.code = code.trim().to_string();
        }
    }
}

impl Record for Loan {
    type Patch = LoanPatch;

    const RESOURCE: Resource = Resource::Loans;
    const STORAGE_KEY: &'static str = LOANS_KEY;
    const DATE_COLUMN: &'static str = "tanggal_pinjam";
    const REMOTE_DELETE: bool = true;
    const DELETE_PROMPT: &'static str = "Hapus riwayat peminjaman ini?";
    const CSV_HEADERS: &'static [&'static str] = &[
        "No",
        "Kode",
        "Nama",
        "Devisi",
        "Tanggal Pinjam",
        "Tanggal Kembali",
        "Status",
        "Keterangan",
    ];

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.item_code.clone(),
            self.borrower.clone(),
            self.group.clone(),
            self.borrowed_at.clone().unwrap_or_default(),
            self.return_due.clone().unwrap_or_default(),
            self.status.as_str().to_string(),
            self.notes.clone(),
        ]
    }

    fn merge_ack(&mut self, ack: &RemoteAck) {
        if let Some(id) = ack.id.as_ref().filter(|id| !id.is_unassigned()) {
            self.id = id.clone();
        }
    }

    fn apply_patch(&mut self, patch: &LoanPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// Loans only ever change status after creation
    fn remote_update_body(&self) -> Result<Value> {
        Ok(json!({ "status": self.status.as_str() }))
    }
}
