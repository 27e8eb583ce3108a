//! Loan desk service
//!
//! Loan intake, QR scanning, the one-way "returned" transition and the
//! loan history with item names resolved from the registry.

use super::items::ItemRegistry;
use crate::clock::{format_timestamp, Clock};
use crate::config::ITEMS_KEY;
use crate::controller::{ListController, RecordPolicy};
use crate::database::{Item, Loan, LoanPatch, LoanStatus, RecordId};
use crate::error::{AppError, Result};
use crate::gateway::Resource;
use crate::qr::{code_from_payload, FrameDecoder};
use crate::sink::Confirm;
use std::collections::HashMap;
use std::sync::Arc;

/// Values entered in the loan form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoanDraft {
    pub item_code: String,
    pub borrower: String,
    pub group: String,
    /// Defaults to now when blank
    pub borrowed_at: Option<String>,
    pub return_due: Option<String>,
    /// Encoded selfie taken at pickup
    pub photo: Option<String>,
    pub notes: String,
}

pub struct LoanPolicy {
    clock: Arc<dyn Clock>,
}

impl LoanPolicy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl RecordPolicy<Loan> for LoanPolicy {
    fn prepare_insert(&self, loan: &mut Loan, _existing: &[Loan]) -> Result<()> {
        if loan.item_code.trim().is_empty() {
            return Err(AppError::validation("Kode barang wajib diisi"));
        }
        if loan.borrower.trim().is_empty() {
            return Err(AppError::validation("Nama peminjam wajib diisi"));
        }

        let now = self.clock.now();
        loan.status = LoanStatus::Active;
        if loan.created_at.as_deref().map_or(true, |s| s.trim().is_empty()) {
            loan.created_at = Some(format_timestamp(now));
        }
        if loan.borrowed_at.as_deref().map_or(true, |s| s.trim().is_empty()) {
            loan.borrowed_at = Some(now.format("%Y-%m-%dT%H:%M").to_string());
        }
        Ok(())
    }

    fn prepare_update(&self, current: &Loan, updated: &mut Loan, _existing: &[Loan]) -> Result<()> {
        if current.status == LoanStatus::Returned && updated.status == LoanStatus::Active {
            return Err(AppError::validation("Peminjaman yang sudah selesai tidak bisa diaktifkan lagi"));
        }
        Ok(())
    }
}

pub struct LoanDesk {
    loans: Arc<ListController<Loan>>,
    items: Arc<ItemRegistry>,
}

impl LoanDesk {
    pub fn new(loans: Arc<ListController<Loan>>, items: Arc<ItemRegistry>) -> Self {
        Self { loans, items }
    }

    pub fn controller(&self) -> &Arc<ListController<Loan>> {
        &self.loans
    }

    /// Load the local history, pull remote loans when a gateway is
    /// configured, then resolve item names
    pub async fn load_history(&self) -> Result<()> {
        self.loans.load().await?;
        self.refresh_from_remote().await?;
        self.resolve_item_names().await
    }

    /// Merge `GET /loans` into the local collection; a failed fetch keeps
    /// local data as-is. Returns the number of merged records.
    pub async fn refresh_from_remote(&self) -> Result<usize> {
        let Some(gateway) = self.loans.gateway() else {
            return Ok(0);
        };

        let values = match gateway.list(Resource::Loans).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Could not fetch remote loans, showing local history: {}", e);
                return Ok(0);
            }
        };

        let loans: Vec<Loan> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(loan) => Some(loan),
                Err(e) => {
                    tracing::warn!("Skipping malformed remote loan: {}", e);
                    None
                }
            })
            .collect();

        self.loans.merge_remote(loans).await
    }

    /// Fill `item_name` from the registry; unknown codes render blank
    pub async fn resolve_item_names(&self) -> Result<()> {
        let items: Vec<Item> = self.loans.store().read_collection(ITEMS_KEY).await?;
        let names: HashMap<String, String> = items
            .into_iter()
            .map(|item| (item.code, item.name))
            .collect();

        self.loans
            .refresh_derived(|loan| {
                if let Some(name) = names.get(&loan.item_code) {
                    loan.item_name = Some(name.clone());
                }
            })
            .await;
        Ok(())
    }

    /// Decode one camera frame and resolve it to an item
    pub async fn scan(&self, decoder: &dyn FrameDecoder) -> Result<Option<Item>> {
        let Some(code) = decoder.decode_frame().as_deref().and_then(code_from_payload) else {
            return Ok(None);
        };

        tracing::debug!("Scanned item code {}", code);
        let item = self.items.find_by_code(&code).await?;
        if item.is_none() {
            tracing::info!("Scanned code {} does not match any item", code);
        }
        Ok(item)
    }

    /// Record a new loan
    pub async fn submit(&self, draft: LoanDraft) -> Result<Loan> {
        let item_code = draft.item_code.trim().to_string();
        let item_name = match item_code.as_str() {
            "" => None,
            code => self.items.find_by_code(code).await?.map(|item| item.name),
        };

        let loan = Loan {
            id: RecordId::default(),
            item_code,
            item_name,
            borrower: draft.borrower.trim().to_string(),
            group: draft.group.trim().to_string(),
            borrowed_at: draft.borrowed_at.filter(|s| !s.trim().is_empty()),
            return_due: draft.return_due.filter(|s| !s.trim().is_empty()),
            status: LoanStatus::Active,
            photo: draft.photo.filter(|s| !s.is_empty()),
            notes: draft.notes,
            created_at: None,
        };

        self.loans.add(loan).await
    }

    /// Mark a loan returned. Returned loans stay returned; `Ok(None)` when
    /// the id is unknown.
    pub async fn mark_returned(&self, id: &RecordId) -> Result<Option<Loan>> {
        match self.loans.get(id).await {
            None => Ok(None),
            Some(loan) if loan.status == LoanStatus::Returned => Ok(Some(loan)),
            Some(_) => self.loans.update(id, LoanPatch::returned()).await,
        }
    }

    pub async fn remove(&self, id: &RecordId, confirm: &dyn Confirm) -> Result<bool> {
        self.loans.confirm_and_remove(id, confirm).await
    }
}
