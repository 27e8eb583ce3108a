//! Database models
//!
//! Records persisted as JSON values in the key-value store.
//! Wire names follow the storage layout written by the browser front end
//! (`nama`, `kondisi`, `tanggal_pinjam`, ...) so existing dumps load as-is.

use crate::clock::parse_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Opaque record identifier.
///
/// Older data stores numeric ids (`Date.now()`), servers may hand back
/// strings; both read into the same type and are written back as strings.
/// The empty id means "not yet assigned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Numeric value of timestamp-style ids
    pub fn as_millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(serde_json::Number),
            Text(String),
            Null(()),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => RecordId(n.to_string()),
            RawId::Text(s) => RecordId(s),
            RawId::Null(()) => RecordId::default(),
        })
    }
}

// ===== Items =====

/// Physical condition of a registered item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Condition {
    #[default]
    Good,
    Damaged,
    UnderRepair,
}

impl Condition {
    /// Stored form
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Good => "baik",
            Condition::Damaged => "rusak",
            Condition::UnderRepair => "perbaikan",
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            Condition::Good => "Baik",
            Condition::Damaged => "Rusak",
            Condition::UnderRepair => "Perbaikan",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baik" | "good" => Ok(Condition::Good),
            "rusak" | "damaged" => Ok(Condition::Damaged),
            "perbaikan" | "under-repair" | "under_repair" => Ok(Condition::UnderRepair),
            other => Err(format!("Unknown item condition: {}", other)),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Condition> for &'static str {
    fn from(c: Condition) -> Self {
        c.as_str()
    }
}

/// Item photo: an embedded `data:` URI or a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageRef {
    Embedded(String),
    Url(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Embedded(s) | ImageRef::Url(s) => s,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, ImageRef::Embedded(_))
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        if s.starts_with("data:") {
            ImageRef::Embedded(s)
        } else {
            ImageRef::Url(s)
        }
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        ImageRef::from(s.to_string())
    }
}

impl From<ImageRef> for String {
    fn from(img: ImageRef) -> Self {
        match img {
            ImageRef::Embedded(s) | ImageRef::Url(s) => s,
        }
    }
}

/// A registered asset ("barang")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: RecordId,
    #[serde(rename = "nama", default)]
    pub name: String,
    #[serde(rename = "kondisi", default)]
    pub condition: Condition,
    #[serde(rename = "jenis", default)]
    pub category: String,
    /// Registration date, `DD-MM-YYYY` or `YYYY-MM-DD`
    #[serde(rename = "tanggal", default)]
    pub registered_on: String,
    #[serde(rename = "img", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub code: String,
    /// Derived from `code`; never the source of truth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
}

/// Field changes for an existing item; `None` leaves the field alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub condition: Option<Condition>,
    pub category: Option<String>,
    pub registered_on: Option<String>,
    pub image: Option<ImageRef>,
    pub code: Option<String>,
}

// ===== Loans =====

/// Persisted loan status. Overdue is derived, see [`Loan::display_status`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum LoanStatus {
    #[default]
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Active => "aktif",
            LoanStatus::Returned => "selesai",
        }
    }
}

impl From<String> for LoanStatus {
    /// Anything that is not an active marker counts as returned; a legacy
    /// persisted "terlambat" is an active loan past its deadline.
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "aktif" | "active" | "terlambat" | "overdue" => LoanStatus::Active,
            _ => LoanStatus::Returned,
        }
    }
}

impl From<LoanStatus> for &'static str {
    fn from(s: LoanStatus) -> Self {
        s.as_str()
    }
}

/// Status shown to users, computed at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Active,
    Returned,
    Overdue,
}

impl DisplayStatus {
    pub fn label(self) -> &'static str {
        match self {
            DisplayStatus::Active => "aktif",
            DisplayStatus::Returned => "selesai",
            DisplayStatus::Overdue => "terlambat",
        }
    }
}

/// A borrowing event ("peminjaman")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    #[serde(default)]
    pub id: RecordId,
    /// Reference to `Item.code`; not checked against the registry
    #[serde(default)]
    pub item_code: String,
    /// Display label resolved from the registry, blank for dangling codes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(rename = "nama", default)]
    pub borrower: String,
    #[serde(rename = "devisi", default)]
    pub group: String,
    #[serde(rename = "tanggal_pinjam", default)]
    pub borrowed_at: Option<String>,
    #[serde(rename = "tanggal_kembali", default)]
    pub return_due: Option<String>,
    #[serde(default)]
    pub status: LoanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "keterangan", default)]
    pub notes: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Loan {
    /// Timestamp used for bucketing: borrow time, else creation time
    pub fn effective_timestamp(&self) -> Option<NaiveDateTime> {
        self.borrowed_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.created_at.as_deref().and_then(parse_timestamp))
    }

    pub fn return_deadline(&self) -> Option<NaiveDateTime> {
        self.return_due.as_deref().and_then(parse_timestamp)
    }

    /// Active with a deadline strictly before `now`
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.status == LoanStatus::Active
            && self.return_deadline().is_some_and(|deadline| deadline < now)
    }

    pub fn display_status(&self, now: NaiveDateTime) -> DisplayStatus {
        match self.status {
            LoanStatus::Returned => DisplayStatus::Returned,
            LoanStatus::Active if self.is_overdue(now) => DisplayStatus::Overdue,
            LoanStatus::Active => DisplayStatus::Active,
        }
    }
}

/// Field changes for an existing loan. Only the one-way return transition
/// is allowed after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanPatch {
    pub status: Option<LoanStatus>,
}

impl LoanPatch {
    pub fn returned() -> Self {
        Self {
            status: Some(LoanStatus::Returned),
        }
    }
}

// ===== View metadata =====

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn toggled(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    #[serde(default)]
    pub dir: SortDir,
}

/// Persisted view settings stored under `<key>:meta`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}
