//! List controller
//!
//! Owns one collection and its view state. Mutations follow the optimistic
//! sync policy: the record is applied and persisted locally first, then the
//! gateway is tried, and server-assigned fields are merged back only if the
//! record still exists by then. A failed remote write leaves the local
//! write in place and is reported as an offline outcome; nothing is queued
//! for retry.
//!
//! The state lock is held across store writes but never across a gateway
//! call.

use super::pagination::{pager, PagerItem};
use super::record::Record;
use super::view::{self, normalize_filter, ViewState, VisiblePage};
use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_PAGE_SIZE;
use crate::database::{RecordId, SortDir};
use crate::error::Result;
use crate::export::to_csv;
use crate::gateway::{Gateway, RemoteAck};
use crate::sink::{Action, Confirm, Notice, Notifier, NullSink, RenderSink, SyncOutcome};
use crate::storage::Store;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Validation and derived-field hooks run before a record is stored
pub trait RecordPolicy<R>: Send + Sync {
    /// Validate and complete a new record; `existing` is the collection
    fn prepare_insert(&self, record: &mut R, existing: &[R]) -> Result<()>;

    /// Validate an edited record against its previous version
    fn prepare_update(&self, _current: &R, _updated: &mut R, _existing: &[R]) -> Result<()> {
        Ok(())
    }
}

struct ListState<R> {
    records: Vec<R>,
    view: ViewState,
    last_id: i64,
}

impl<R: Record> ListState<R> {
    fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Millisecond ids, bumped so they stay strictly increasing
    fn next_id(&mut self, now_millis: i64) -> RecordId {
        let id = now_millis.max(self.last_id + 1);
        self.last_id = id;
        RecordId::from_millis(id)
    }

    fn note_id(&mut self, id: &RecordId) {
        if let Some(millis) = id.as_millis() {
            self.last_id = self.last_id.max(millis);
        }
    }

    fn clamp_page(&mut self) {
        let count = view::filtered_sorted(&self.records, &self.view).len();
        self.view.clamp(count);
    }
}

pub struct ListController<R: Record> {
    store: Store,
    gateway: Option<Arc<dyn Gateway>>,
    policy: Option<Arc<dyn RecordPolicy<R>>>,
    sink: Arc<dyn RenderSink<R>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: RwLock<ListState<R>>,
}

impl<R: Record> ListController<R> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            gateway: None,
            policy: None,
            sink: Arc::new(NullSink),
            notifier: Arc::new(NullSink),
            clock: Arc::new(SystemClock),
            state: RwLock::new(ListState {
                records: Vec::new(),
                view: ViewState::default(),
                last_id: 0,
            }),
        }
    }

    pub fn with_gateway(mut self, gateway: Option<Arc<dyn Gateway>>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn RecordPolicy<R>>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RenderSink<R>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn gateway(&self) -> Option<&Arc<dyn Gateway>> {
        self.gateway.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Load the stored collection and view state
    pub async fn load(&self) -> Result<()> {
        self.load_with_seed(Vec::new()).await
    }

    /// Load, seeding an empty collection with `seed` and persisting it
    pub async fn load_with_seed(&self, seed: Vec<R>) -> Result<()> {
        let mut records: Vec<R> = self.store.read_collection(R::STORAGE_KEY).await?;
        let meta = self.store.read_meta(R::STORAGE_KEY).await?;

        {
            let mut state = self.state.write().await;
            state.last_id = 0;
            for record in &records {
                state.note_id(record.id());
            }

            if records.is_empty() && !seed.is_empty() {
                tracing::info!("Seeding {} with {} records", R::STORAGE_KEY, seed.len());
                let now = self.clock.now_millis();
                records = seed;
                for record in records.iter_mut() {
                    if record.id().is_unassigned() {
                        record.set_id(state.next_id(now));
                    } else {
                        state.note_id(record.id());
                    }
                }
                self.store.write_collection(R::STORAGE_KEY, &records).await?;
            }

            state.records = records;
            state.view = ViewState::from_meta(&meta);
            state.clamp_page();

            tracing::info!(
                "Loaded {} records from {} (page {}, size {})",
                state.records.len(),
                R::STORAGE_KEY,
                state.view.page,
                state.view.page_size
            );
        }

        self.render().await;
        Ok(())
    }

    pub async fn set_filter(&self, text: &str) {
        {
            let mut state = self.state.write().await;
            state.view.filter = normalize_filter(text);
            state.view.page = 1;
            state.clamp_page();
        }
        self.render().await;
    }

    /// Non-positive sizes fall back to the default
    pub async fn set_page_size(&self, size: i64) {
        {
            let mut state = self.state.write().await;
            state.view.page_size = usize::try_from(size)
                .ok()
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE);
            state.view.page = 1;
            state.clamp_page();
        }
        self.render().await;
    }

    pub async fn set_page(&self, page: usize) {
        {
            let mut state = self.state.write().await;
            state.view.page = page;
            state.clamp_page();
        }
        self.render().await;
    }

    /// Sort by a column, toggling direction when it is already sorted
    pub async fn set_sort(&self, column: &str) {
        {
            let mut state = self.state.write().await;
            state.view.toggle_sort(column);
            state.clamp_page();
        }
        self.render().await;
    }

    pub async fn sort_indicator(&self, column: &str) -> Option<SortDir> {
        self.state.read().await.view.sort_indicator(column)
    }

    pub async fn view_state(&self) -> ViewState {
        self.state.read().await.view.clone()
    }

    /// Add a record, returning it as stored
    pub async fn add(&self, mut record: R) -> Result<R> {
        let local_id = {
            let mut state = self.state.write().await;

            if let Some(policy) = &self.policy {
                policy.prepare_insert(&mut record, &state.records)?;
            }
            if record.id().is_unassigned() {
                let id = state.next_id(self.clock.now_millis());
                record.set_id(id);
            } else {
                state.note_id(record.id());
            }

            state.records.push(record.clone());
            if let Err(e) = self.store.write_collection(R::STORAGE_KEY, &state.records).await {
                state.records.pop();
                return Err(e);
            }
            state.clamp_page();
            record.id().clone()
        };

        tracing::info!("Added record {} to {}", local_id, R::STORAGE_KEY);

        let outcome = match &self.gateway {
            None => SyncOutcome::LocalOnly,
            Some(gateway) => {
                let body = serde_json::to_value(&record)?;
                match gateway.create(R::RESOURCE, body).await {
                    Ok(ack) => {
                        if let Some(merged) = self.merge_ack(&local_id, &ack).await {
                            record = merged;
                        }
                        SyncOutcome::Server
                    }
                    Err(e) => {
                        tracing::warn!("Remote create failed for {}, kept offline: {}", local_id, e);
                        SyncOutcome::Offline
                    }
                }
            }
        };

        self.render().await;
        self.notify(Action::Added, Some(outcome));
        Ok(record)
    }

    /// Apply a patch to an existing record; `Ok(None)` when the id is unknown
    pub async fn update(&self, id: &RecordId, patch: R::Patch) -> Result<Option<R>> {
        let updated = {
            let mut state = self.state.write().await;
            let Some(pos) = state.position(id) else {
                tracing::debug!("Update of unknown record {} ignored", id);
                return Ok(None);
            };

            let current = state.records[pos].clone();
            let mut updated = current.clone();
            updated.apply_patch(&patch);
            updated.set_id(current.id().clone());

            if let Some(policy) = &self.policy {
                policy.prepare_update(&current, &mut updated, &state.records)?;
            }

            state.records[pos] = updated.clone();
            if let Err(e) = self.store.write_collection(R::STORAGE_KEY, &state.records).await {
                state.records[pos] = current;
                return Err(e);
            }
            state.clamp_page();
            updated
        };

        tracing::info!("Updated record {} in {}", id, R::STORAGE_KEY);

        let mut result = updated.clone();
        let outcome = match &self.gateway {
            None => SyncOutcome::LocalOnly,
            Some(gateway) => {
                let body = updated.remote_update_body()?;
                match gateway.update(R::RESOURCE, id, body).await {
                    Ok(ack) => {
                        // identity never changes on update
                        let ack = RemoteAck { id: None, ..ack };
                        if let Some(merged) = self.merge_ack(id, &ack).await {
                            result = merged;
                        }
                        SyncOutcome::Server
                    }
                    Err(e) => {
                        tracing::warn!("Remote update failed for {}, kept offline: {}", id, e);
                        SyncOutcome::Offline
                    }
                }
            }
        };

        self.render().await;
        self.notify(Action::Updated, Some(outcome));
        Ok(Some(result))
    }

    /// Remove a record; `Ok(false)` when the id is unknown
    pub async fn remove(&self, id: &RecordId) -> Result<bool> {
        {
            let mut state = self.state.write().await;
            let Some(pos) = state.position(id) else {
                tracing::debug!("Removal of unknown record {} ignored", id);
                return Ok(false);
            };

            let removed = state.records.remove(pos);
            if let Err(e) = self.store.write_collection(R::STORAGE_KEY, &state.records).await {
                state.records.insert(pos, removed);
                return Err(e);
            }
            state.clamp_page();
        }

        tracing::info!("Removed record {} from {}", id, R::STORAGE_KEY);
        self.render().await;
        self.notify(Action::Removed, None);

        if R::REMOTE_DELETE {
            if let Some(gateway) = &self.gateway {
                if let Err(e) = gateway.delete(R::RESOURCE, id).await {
                    tracing::warn!("Remote delete failed for {}: {}", id, e);
                }
            }
        }

        Ok(true)
    }

    /// Ask first, then remove
    pub async fn confirm_and_remove(&self, id: &RecordId, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(R::DELETE_PROMPT).await {
            tracing::debug!("Removal of {} cancelled", id);
            return Ok(false);
        }
        self.remove(id).await
    }

    /// Merge records fetched from the server by id, appending unknown ones
    pub async fn merge_remote(&self, remote: Vec<R>) -> Result<usize> {
        let count = remote.len();
        {
            let mut state = self.state.write().await;
            for record in remote {
                if record.id().is_unassigned() {
                    continue;
                }
                state.note_id(record.id());
                match state.position(record.id()) {
                    Some(pos) => state.records[pos] = record,
                    None => state.records.push(record),
                }
            }
            self.store.write_collection(R::STORAGE_KEY, &state.records).await?;
            state.clamp_page();
        }

        tracing::info!("Merged {} remote records into {}", count, R::STORAGE_KEY);
        self.render().await;
        Ok(count)
    }

    /// Recompute display-only fields in memory and re-render
    pub async fn refresh_derived<F>(&self, mut derive: F)
    where
        F: FnMut(&mut R),
    {
        {
            let mut state = self.state.write().await;
            state.records.iter_mut().for_each(&mut derive);
        }
        self.render().await;
    }

    pub async fn visible_page(&self) -> VisiblePage<R> {
        let state = self.state.read().await;
        view::visible_page(&state.records, &state.view)
    }

    pub async fn pager(&self) -> Vec<PagerItem> {
        let page = self.visible_page().await;
        pager(page.current_page, page.total_pages)
    }

    /// CSV of the filtered and sorted view, all pages
    pub async fn export_csv(&self) -> Result<String> {
        let state = self.state.read().await;
        let rows = view::filtered_sorted(&state.records, &state.view)
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let mut fields = vec![(index + 1).to_string()];
                fields.extend(record.csv_fields());
                fields
            });

        let csv = to_csv(R::CSV_HEADERS, rows)?;
        tracing::debug!("Exported {} as CSV ({} bytes)", R::STORAGE_KEY, csv.len());
        Ok(csv)
    }

    /// Snapshot of the collection in insertion order
    pub async fn records(&self) -> Vec<R> {
        self.state.read().await.records.clone()
    }

    pub async fn get(&self, id: &RecordId) -> Option<R> {
        let state = self.state.read().await;
        state.position(id).map(|pos| state.records[pos].clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Merge server-assigned fields into a stored record. The merge is
    /// only kept in memory once it is persisted; a failed store write
    /// leaves the local record as it was.
    async fn merge_ack(&self, id: &RecordId, ack: &RemoteAck) -> Option<R> {
        let mut state = self.state.write().await;
        let Some(pos) = state.position(id) else {
            tracing::debug!("Record {} removed before the server answered, dropping response", id);
            return None;
        };

        let mut ack = ack.clone();
        let clashing_id = ack
            .id
            .as_ref()
            .filter(|server_id| state.position(server_id).is_some_and(|other| other != pos))
            .cloned();
        if let Some(server_id) = clashing_id {
            tracing::warn!(
                "Server id {} is already used in {}, keeping local id {}",
                server_id,
                R::STORAGE_KEY,
                id
            );
            ack.id = None;
        }

        let mut merged = state.records[pos].clone();
        merged.merge_ack(&ack);
        let previous = std::mem::replace(&mut state.records[pos], merged.clone());

        if let Err(e) = self.store.write_collection(R::STORAGE_KEY, &state.records).await {
            tracing::warn!("Failed to save server fields for {}: {}", id, e);
            state.records[pos] = previous;
            return None;
        }

        state.note_id(merged.id());
        Some(merged)
    }

    /// Persist view state and hand the visible page to the sink
    async fn render(&self) {
        let (page, meta) = {
            let state = self.state.read().await;
            (
                view::visible_page(&state.records, &state.view),
                state.view.to_meta(),
            )
        };

        if let Err(e) = self.store.write_meta(R::STORAGE_KEY, &meta).await {
            tracing::warn!("Failed to save view state for {}: {}", R::STORAGE_KEY, e);
        }
        self.sink.render(&page);
    }

    fn notify(&self, action: Action, outcome: Option<SyncOutcome>) {
        self.notifier.notify(Notice {
            action,
            resource: R::RESOURCE,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::{Condition, Item, ItemPatch, Loan, LoanPatch, LoanStatus};
    use crate::error::AppError;
    use crate::gateway::{MockGateway, Resource};
    use crate::sink::AutoConfirm;
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notice>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<usize>>);

    impl<R> RenderSink<R> for RecordingSink {
        fn render(&self, page: &VisiblePage<R>) {
            self.0.lock().unwrap().push(page.rows.len());
        }
    }

    fn item(name: &str) -> Item {
        Item {
            id: RecordId::default(),
            name: name.to_string(),
            condition: Condition::Good,
            category: "Elektronik".to_string(),
            registered_on: "2024-01-05".to_string(),
            image: Some("https://cdn/x.jpg".into()),
            code: format!("ITEM-{}", name),
            qr: None,
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at_date(2024, 3, 10).unwrap())
    }

    fn create_test_controller(
        gateway: Option<Arc<dyn Gateway>>,
    ) -> (ListController<Item>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = ListController::new(Store::in_memory())
            .with_gateway(gateway)
            .with_notifier(notifier.clone())
            .with_clock(fixed_clock());
        (controller, notifier)
    }

    #[tokio::test]
    async fn test_add_without_gateway_is_local() {
        let (controller, notifier) = create_test_controller(None);

        let added = controller.add(item("Kamera")).await.unwrap();

        assert!(!added.id.is_unassigned());
        assert_eq!(controller.len().await, 1);
        let notices = notifier.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].outcome, Some(SyncOutcome::LocalOnly));
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_under_frozen_clock() {
        let (controller, _) = create_test_controller(None);

        let a = controller.add(item("A")).await.unwrap();
        let b = controller.add(item("B")).await.unwrap();

        assert!(b.id.as_millis().unwrap() > a.id.as_millis().unwrap());
    }

    #[tokio::test]
    async fn test_failed_remote_create_keeps_one_offline_record() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .times(1)
            .returning(|_, _| Err(AppError::Generic("connection refused".to_string())));
        let (controller, notifier) = create_test_controller(Some(Arc::new(gateway)));

        controller.add(item("Kamera")).await.unwrap();

        let stored: Vec<Item> = controller.store().read_collection("dataBarang").await.unwrap();
        assert_eq!(stored.len(), 1);
        let notices = notifier.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].outcome, Some(SyncOutcome::Offline));
    }

    #[tokio::test]
    async fn test_successful_create_merges_server_fields() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .withf(|resource, body| *resource == Resource::Items && body["nama"] == "Kamera")
            .returning(|_, _| {
                Ok(RemoteAck {
                    id: Some(RecordId::new("srv-1")),
                    img_url: Some("https://cdn/server.jpg".to_string()),
                    qr_url: None,
                })
            });
        let (controller, notifier) = create_test_controller(Some(Arc::new(gateway)));

        let added = controller.add(item("Kamera")).await.unwrap();

        assert_eq!(added.id.as_str(), "srv-1");
        let stored: Vec<Item> = controller.store().read_collection("dataBarang").await.unwrap();
        assert_eq!(stored[0].id.as_str(), "srv-1");
        assert_eq!(stored[0].image.as_ref().unwrap().as_str(), "https://cdn/server.jpg");
        assert_eq!(notifier.0.lock().unwrap()[0].outcome, Some(SyncOutcome::Server));
    }

    /// Backend whose collection writes start failing after `allowed` of them
    struct FailingWrites {
        inner: MemoryStore,
        allowed: usize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for FailingWrites {
        async fn read_raw(&self, key: &str) -> Result<Option<String>> {
            self.inner.read_raw(key).await
        }

        async fn write_raw(&self, key: &str, value: &str) -> Result<()> {
            if key == "dataBarang" && self.writes.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(AppError::Generic("disk full".to_string()));
            }
            self.inner.write_raw(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<bool> {
            self.inner.remove(key).await
        }

        async fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn test_unsaved_server_fields_are_not_kept_in_memory() {
        let mut gateway = MockGateway::new();
        gateway.expect_create().returning(|_, _| {
            Ok(RemoteAck {
                id: Some(RecordId::new("srv-1")),
                ..RemoteAck::default()
            })
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Store::new(Arc::new(FailingWrites {
            inner: MemoryStore::new(),
            allowed: 1,
            writes: AtomicUsize::new(0),
        }));
        let controller: ListController<Item> = ListController::new(store)
            .with_gateway(Some(Arc::new(gateway)))
            .with_notifier(notifier.clone())
            .with_clock(fixed_clock());

        let added = controller.add(item("Kamera")).await.unwrap();

        let stored: Vec<Item> = controller.store().read_collection("dataBarang").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(added.id, stored[0].id);
        assert_eq!(controller.records().await[0].id, stored[0].id);
        assert_ne!(added.id.as_str(), "srv-1");
        let notices = notifier.0.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].outcome, Some(SyncOutcome::Server));
    }

    #[tokio::test]
    async fn test_server_id_already_in_use_is_not_adopted() {
        let mut gateway = MockGateway::new();
        gateway.expect_create().returning(|_, _| {
            Ok(RemoteAck {
                id: Some(RecordId::new("7")),
                ..RemoteAck::default()
            })
        });
        let (controller, _) = create_test_controller(Some(Arc::new(gateway)));

        let a = controller.add(item("A")).await.unwrap();
        let b = controller.add(item("B")).await.unwrap();

        assert_eq!(a.id.as_str(), "7");
        assert_ne!(b.id, a.id);
        assert!(controller.get(&b.id).await.is_some());

        assert!(controller.remove(&RecordId::new("7")).await.unwrap());
        let codes: Vec<String> = controller.records().await.into_iter().map(|r| r.code).collect();
        assert_eq!(codes, vec!["ITEM-B".to_string()]);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_noop() {
        let (controller, notifier) = create_test_controller(None);

        let result = controller
            .update(&RecordId::new("404"), ItemPatch::default())
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_preserves_identity() {
        let (controller, _) = create_test_controller(None);
        let added = controller.add(item("Kamera")).await.unwrap();

        let updated = controller
            .update(
                &added.id,
                ItemPatch {
                    name: Some("Kamera Baru".to_string()),
                    ..ItemPatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, added.id);
        assert_eq!(updated.code, added.code);
        assert_eq!(updated.name, "Kamera Baru");
    }

    #[tokio::test]
    async fn test_remove_then_page_clamps() {
        let (controller, _) = create_test_controller(None);
        let mut ids = Vec::new();
        for name in ["A", "B", "C"] {
            ids.push(controller.add(item(name)).await.unwrap().id);
        }
        controller.set_page_size(2).await;
        controller.set_page(2).await;
        assert_eq!(controller.visible_page().await.current_page, 2);

        assert!(controller.remove(&ids[2]).await.unwrap());

        let page = controller.visible_page().await;
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 1);
        assert!(!controller.remove(&ids[2]).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_and_remove_respects_answer() {
        let (controller, _) = create_test_controller(None);
        let added = controller.add(item("A")).await.unwrap();

        assert!(!controller.confirm_and_remove(&added.id, &AutoConfirm(false)).await.unwrap());
        assert_eq!(controller.len().await, 1);
        assert!(controller.confirm_and_remove(&added.id, &AutoConfirm(true)).await.unwrap());
        assert!(controller.is_empty().await);
    }

    #[tokio::test]
    async fn test_loan_removal_is_forwarded_best_effort() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .returning(|_, _| Ok(RemoteAck::default()));
        gateway
            .expect_delete()
            .times(1)
            .returning(|_, _| Err(AppError::Generic("timeout".to_string())));
        let controller: ListController<Loan> = ListController::new(Store::in_memory())
            .with_gateway(Some(Arc::new(gateway)))
            .with_clock(fixed_clock());
        let loan: Loan = serde_json::from_value(serde_json::json!({
            "item_code": "ITEM-1", "nama": "Budi", "status": "aktif"
        }))
        .unwrap();

        let added = controller.add(loan).await.unwrap();

        assert!(controller.remove(&added.id).await.unwrap());
        assert!(controller.is_empty().await);
    }

    #[tokio::test]
    async fn test_loan_update_sends_status_only() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_create()
            .returning(|_, _| Ok(RemoteAck::default()));
        gateway
            .expect_update()
            .withf(|resource, _, body| {
                *resource == Resource::Loans && *body == serde_json::json!({"status": "selesai"})
            })
            .times(1)
            .returning(|_, _, _| Ok(RemoteAck::default()));
        let controller: ListController<Loan> = ListController::new(Store::in_memory())
            .with_gateway(Some(Arc::new(gateway)))
            .with_clock(fixed_clock());
        let loan: Loan = serde_json::from_value(serde_json::json!({
            "item_code": "ITEM-1", "nama": "Budi", "status": "aktif"
        }))
        .unwrap();
        let added = controller.add(loan).await.unwrap();

        let updated = controller
            .update(&added.id, LoanPatch::returned())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, LoanStatus::Returned);
    }

    #[tokio::test]
    async fn test_load_seeds_empty_collection_and_restores_meta() {
        let store = Store::in_memory();
        let first: ListController<Item> = ListController::new(store.clone()).with_clock(fixed_clock());
        first.load_with_seed(vec![item("A"), item("B")]).await.unwrap();
        first.set_sort("nama").await;
        first.set_sort("nama").await;

        let sink = Arc::new(RecordingSink::default());
        let second: ListController<Item> = ListController::new(store)
            .with_sink(sink.clone())
            .with_clock(fixed_clock());
        second.load_with_seed(vec![item("ignored")]).await.unwrap();

        assert_eq!(second.len().await, 2);
        assert_eq!(second.sort_indicator("nama").await, Some(SortDir::Desc));
        let page = second.visible_page().await;
        assert_eq!(page.rows[0].name, "B");
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[2]);
    }

    #[tokio::test]
    async fn test_export_uses_filtered_sorted_view() {
        let (controller, _) = create_test_controller(None);
        controller.add(item("Lensa Sony")).await.unwrap();
        controller.add(item("Tripod")).await.unwrap();
        controller.add(item("Kamera Sony")).await.unwrap();
        controller.set_page_size(1).await;
        controller.set_filter("SONY").await;
        controller.set_sort("nama").await;

        let csv = controller.export_csv().await.unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<(String, String)> = reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("1".to_string(), "Kamera Sony".to_string()),
                ("2".to_string(), "Lensa Sony".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_merge_remote_replaces_by_id() {
        let (controller, _) = create_test_controller(None);
        let added = controller.add(item("Kamera")).await.unwrap();
        let mut remote = added.clone();
        remote.name = "Kamera (server)".to_string();
        let mut fresh = item("Lensa");
        fresh.id = RecordId::new("99");

        controller.merge_remote(vec![remote, fresh]).await.unwrap();

        let records = controller.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Kamera (server)");
    }
}
