//! Item registry service
//!
//! Wraps the item list controller with the registry rules: every item
//! needs a photo, codes are generated when missing and kept unique, and the
//! QR payload is always derived from the code.

use crate::config::ITEMS_KEY;
use crate::controller::{ListController, RecordPolicy};
use crate::database::{Condition, ImageRef, Item, ItemPatch, RecordId};
use crate::error::{AppError, Result};
use crate::export::{to_csv, UTF8_BOM};
use crate::qr::{qr_payload, unique_code, CodeGenerator, ItemForm};
use std::sync::Arc;

const SPREADSHEET_HEADERS: [&str; 7] = [
    "No",
    "Kode",
    "Nama",
    "Kondisi",
    "Jenis",
    "Tanggal Regis",
    "Foto URL",
];

/// Values entered in the item form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemDraft {
    pub name: String,
    pub condition: Condition,
    pub category: String,
    pub registered_on: String,
    /// Uploaded photo (data URI) or photo link
    pub image: Option<ImageRef>,
}

pub struct ItemPolicy {
    codes: Arc<dyn CodeGenerator>,
    link_base: String,
}

impl ItemPolicy {
    pub fn new(codes: Arc<dyn CodeGenerator>, link_base: impl Into<String>) -> Self {
        Self {
            codes,
            link_base: link_base.into(),
        }
    }
}

fn require_name_and_image(item: &Item) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(AppError::validation("Nama barang wajib diisi"));
    }
    match &item.image {
        Some(image) if !image.as_str().trim().is_empty() => Ok(()),
        _ => Err(AppError::validation("Mohon sertakan foto (upload atau URL)")),
    }
}

impl RecordPolicy<Item> for ItemPolicy {
    fn prepare_insert(&self, item: &mut Item, existing: &[Item]) -> Result<()> {
        require_name_and_image(item)?;

        let candidate = match item.code.trim() {
            "" => self.codes.generate_code_for(&item.name),
            code => code.to_string(),
        };
        item.code = unique_code(&candidate, existing.iter().map(|i| i.code.as_str()));
        item.qr = Some(qr_payload(&self.link_base, &item.code));
        item.name = item.name.trim().to_string();

        tracing::debug!("Prepared new item '{}' with code {}", item.name, item.code);
        Ok(())
    }

    fn prepare_update(&self, current: &Item, updated: &mut Item, existing: &[Item]) -> Result<()> {
        require_name_and_image(updated)?;

        if updated.code != current.code
            && existing
                .iter()
                .any(|i| i.id != current.id && i.code == updated.code)
        {
            return Err(AppError::validation(format!(
                "Kode {} sudah dipakai barang lain",
                updated.code
            )));
        }
        updated.qr = Some(qr_payload(&self.link_base, &updated.code));
        Ok(())
    }
}

/// Item registry backed by a list controller
pub struct ItemRegistry {
    controller: Arc<ListController<Item>>,
}

impl ItemRegistry {
    pub fn new(controller: Arc<ListController<Item>>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<ListController<Item>> {
        &self.controller
    }

    /// Save the form as a new item or as an edit of the item it was opened
    /// with, then close it. `Ok(None)` when the edited item vanished.
    pub async fn submit(&self, form: &mut ItemForm, draft: ItemDraft) -> Result<Option<Item>> {
        let code = form.code_for_save().unwrap_or_default();

        let saved = match form.editing().cloned() {
            Some(id) => {
                let patch = ItemPatch {
                    name: Some(draft.name.trim().to_string()),
                    condition: Some(draft.condition),
                    category: Some(draft.category),
                    registered_on: Some(draft.registered_on),
                    image: draft.image,
                    code: Some(code),
                };
                self.controller.update(&id, patch).await?
            }
            None => {
                let item = Item {
                    id: RecordId::default(),
                    name: draft.name,
                    condition: draft.condition,
                    category: draft.category,
                    registered_on: draft.registered_on,
                    image: draft.image,
                    code,
                    qr: None,
                };
                Some(self.controller.add(item).await?)
            }
        };

        form.close();
        Ok(saved)
    }

    /// Look an item up by code: remote first, local store as fallback
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Item>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }

        if let Some(gateway) = self.controller.gateway() {
            match gateway.find_by_code(code).await {
                Ok(Some(value)) => match serde_json::from_value::<Item>(value) {
                    Ok(item) => return Ok(Some(item)),
                    Err(e) => tracing::warn!("Remote item {} is malformed: {}", code, e),
                },
                Ok(None) => tracing::debug!("Item {} not found remotely", code),
                Err(e) => tracing::warn!("Remote lookup of {} failed, using local data: {}", code, e),
            }
        }

        let items: Vec<Item> = self.controller.store().read_collection(ITEMS_KEY).await?;
        Ok(items.into_iter().find(|item| item.code == code))
    }

    /// Spreadsheet-friendly CSV of every item, BOM-prefixed
    pub async fn export_spreadsheet(&self) -> Result<String> {
        let items = self.controller.records().await;
        let rows = items.iter().enumerate().map(|(index, item)| {
            vec![
                (index + 1).to_string(),
                item.code.clone(),
                item.name.clone(),
                item.condition.as_str().to_string(),
                item.category.clone(),
                item.registered_on.clone(),
                match &item.image {
                    Some(ImageRef::Url(url)) => url.clone(),
                    _ => String::new(),
                },
            ]
        });

        let csv = to_csv(&SPREADSHEET_HEADERS, rows)?;
        tracing::info!("Exported {} items for spreadsheet import", items.len());
        Ok(format!("{}{}", UTF8_BOM, csv))
    }
}
