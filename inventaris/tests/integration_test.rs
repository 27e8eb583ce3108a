//! Integration tests for inventaris
//!
//! These tests verify end-to-end functionality including:
//! - List controller view state on the SQLite store
//! - Offline fallback of remote writes
//! - Monthly report metrics with a frozen clock
//! - Application wiring, remote sync and backup/restore

use async_trait::async_trait;
use chrono::NaiveDate;
use httpmock::prelude::*;
use inventaris::app::{self, SetupOptions, Sinks};
use inventaris::clock::{Clock, FixedClock};
use inventaris::controller::ListController;
use inventaris::database::{
    create_pool, Condition, ImageRef, Item, Loan, LoanStatus, RecordId, Repository, SortDir,
};
use inventaris::error::{AppError, Result};
use inventaris::gateway::{Gateway, RemoteAck, Resource};
use inventaris::qr::{ItemForm, NoDisplay};
use inventaris::services::{ItemDraft, ReportEngine};
use inventaris::sink::{Notice, Notifier, SyncOutcome};
use inventaris::storage::Store;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Helper to create a store on a fresh database file
async fn create_test_store() -> (Store, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let pool = create_pool(&db_path).await.unwrap();
    let store = Store::sqlite(Repository::new(pool));

    (store, temp_dir)
}

fn frozen_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at_date(2024, 3, 15).unwrap())
}

fn item(code: &str, name: &str, registered_on: &str) -> Item {
    Item {
        id: RecordId::default(),
        name: name.to_string(),
        condition: Condition::Good,
        category: "Elektronik".to_string(),
        registered_on: registered_on.to_string(),
        image: Some(ImageRef::from("https://cdn.example/foto.jpg")),
        code: code.to_string(),
        qr: None,
    }
}

fn loan(borrowed_at: &str, return_due: Option<&str>, status: LoanStatus) -> Loan {
    Loan {
        id: RecordId::new("1"),
        item_code: "ITEM-1".to_string(),
        item_name: Some("Proyektor".to_string()),
        borrower: "Budi".to_string(),
        group: "Produksi".to_string(),
        borrowed_at: Some(borrowed_at.to_string()),
        return_due: return_due.map(str::to_string),
        status,
        photo: None,
        notes: String::new(),
        created_at: None,
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Gateway whose every call fails like an unreachable server
struct UnreachableGateway;

#[async_trait]
impl Gateway for UnreachableGateway {
    async fn create(&self, _resource: Resource, _body: Value) -> Result<RemoteAck> {
        Err(AppError::Generic("connection refused".to_string()))
    }

    async fn update(&self, _resource: Resource, _id: &RecordId, _body: Value) -> Result<RemoteAck> {
        Err(AppError::Generic("connection refused".to_string()))
    }

    async fn delete(&self, _resource: Resource, _id: &RecordId) -> Result<()> {
        Err(AppError::Generic("connection refused".to_string()))
    }

    async fn list(&self, _resource: Resource) -> Result<Vec<Value>> {
        Err(AppError::Generic("connection refused".to_string()))
    }

    async fn find_by_code(&self, _code: &str) -> Result<Option<Value>> {
        Err(AppError::Generic("connection refused".to_string()))
    }
}

async fn controller_with(items: Vec<Item>) -> (ListController<Item>, TempDir) {
    let (store, temp) = create_test_store().await;
    let controller = ListController::new(store).with_clock(frozen_clock());
    controller.load().await.unwrap();
    for item in items {
        controller.add(item).await.unwrap();
    }
    (controller, temp)
}

#[tokio::test]
async fn test_filter_only_keeps_matching_records() {
    let (controller, _temp) = controller_with(vec![
        item("A", "Kamera Sony", "2024-01-01"),
        item("B", "Tripod", "2024-01-02"),
        item("C", "Lensa", "2024-01-03"),
        item("D", "kamera Canon", "2024-01-04"),
    ])
    .await;

    controller.set_filter("KAMERA").await;
    let page = controller.visible_page().await;

    assert_eq!(page.filtered_count, 2);
    for row in &page.rows {
        let fields = serde_json::to_value(row).unwrap();
        let matched = fields.as_object().unwrap().values().any(|value| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            text.to_lowercase().contains("kamera")
        });
        assert!(matched, "{:?} does not contain the filter", row.name);
    }
}

#[tokio::test]
async fn test_total_pages_and_page_clamping() {
    let items = (1..=7)
        .map(|i| item(&format!("C{}", i), &format!("Barang {}", i), "2024-01-01"))
        .collect();
    let (controller, _temp) = controller_with(items).await;

    for size in 1..=8i64 {
        controller.set_page_size(size).await;
        let page = controller.visible_page().await;
        assert_eq!(page.total_pages, 7usize.div_ceil(size as usize));
    }

    controller.set_page_size(3).await;
    controller.set_page(3).await;
    assert_eq!(controller.visible_page().await.current_page, 3);

    let last = controller.records().await.last().unwrap().id.clone();
    controller.remove(&last).await.unwrap();

    let page = controller.visible_page().await;
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.current_page, 2);

    controller.set_filter("tidak ada").await;
    let page = controller.visible_page().await;
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.current_page, 1);
}

#[tokio::test]
async fn test_mixed_date_layouts_sort_chronologically() {
    let (controller, _temp) = controller_with(vec![
        item("B", "Kedua", "2024-01-06"),
        item("A", "Pertama", "05-01-2024"),
    ])
    .await;

    controller.set_sort("tanggal").await;
    let page = controller.visible_page().await;

    let names: Vec<&str> = page.rows.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Pertama", "Kedua"]);
}

#[tokio::test]
async fn test_sort_toggles_and_resets() {
    let (controller, _temp) = controller_with(vec![
        item("A", "Tripod", "2024-01-01"),
        item("B", "Kamera", "2024-01-02"),
    ])
    .await;

    controller.set_sort("nama").await;
    assert_eq!(controller.sort_indicator("nama").await, Some(SortDir::Asc));
    controller.set_sort("nama").await;
    assert_eq!(controller.sort_indicator("nama").await, Some(SortDir::Desc));
    assert_eq!(controller.visible_page().await.rows[0].name, "Tripod");

    controller.set_sort("jenis").await;
    assert_eq!(controller.sort_indicator("jenis").await, Some(SortDir::Asc));
    assert_eq!(controller.sort_indicator("nama").await, None);
}

#[tokio::test]
async fn test_offline_add_keeps_one_local_record() {
    let (store, _temp) = create_test_store().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = ListController::<Item>::new(store.clone())
        .with_gateway(Some(Arc::new(UnreachableGateway)))
        .with_notifier(notifier.clone())
        .with_clock(frozen_clock());
    controller.load().await.unwrap();

    let added = controller.add(item("A", "Kamera", "2024-01-01")).await.unwrap();

    let records = controller.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, added.id);
    assert!(added.id.as_millis().is_some());

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].outcome, Some(SyncOutcome::Offline));

    let stored: Vec<Item> = store.read_collection("dataBarang").await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_overdue_depends_on_now() {
    let loans = vec![loan("2024-03-01T09:00", Some("2024-03-05"), LoanStatus::Active)];
    let engine = ReportEngine::process(&loans, None);
    let at = |day: u32| {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    };

    assert_eq!(engine.monthly_row("2024-03", at(20)).overdue, 1);
    assert_eq!(engine.monthly_row("2024-03", at(3)).overdue, 0);
    assert_eq!(engine.monthly_row("2024-03", at(3)).active, 1);
}

#[tokio::test]
async fn test_csv_export_round_trips_quotes_and_commas() {
    let (controller, _temp) = controller_with(vec![
        item("A", "Panasonic, 4K \"Pro\"", "2024-01-01"),
        item("B", "Tripod", "2024-01-02"),
        item("C", "Lensa Panasonic", "2024-01-03"),
    ])
    .await;
    controller.set_filter("panasonic").await;

    let csv = controller.export_csv().await.unwrap();

    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    assert_eq!(&reader.headers().unwrap()[1], "Nama");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let page = controller.visible_page().await;
    assert_eq!(rows.len(), page.filtered_count);
    assert_eq!(&rows[0][1], "Panasonic, 4K \"Pro\"");
    assert_eq!(&rows[1][1], "Lensa Panasonic");
    assert_eq!(&rows[1][0], "2");
}

#[tokio::test]
async fn test_delete_middle_record_keeps_order() {
    let (controller, _temp) = controller_with(vec![
        item("A", "Kamera", "2024-01-01"),
        item("B", "Tripod", "2024-01-02"),
        item("C", "Lensa", "2024-01-03"),
    ])
    .await;

    let b = controller
        .records()
        .await
        .into_iter()
        .find(|i| i.code == "B")
        .unwrap();
    assert!(controller.remove(&b.id).await.unwrap());

    let page = controller.visible_page().await;
    let codes: Vec<&str> = page.rows.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["A", "C"]);
}

#[test]
fn test_march_loan_lands_in_march_of_year_series() {
    let loans = vec![loan("2024-03-10", None, LoanStatus::Active)];
    let now = frozen_clock().now();

    let series = ReportEngine::process(&loans, None).year_series(2024, now);

    let march = &series.months[2];
    assert_eq!(march.total, 1);
    assert_eq!(march.active, 1);
    assert_eq!(march.returned, 0);
    assert_eq!(series.totals().iter().sum::<usize>(), 1);
}

#[tokio::test]
async fn test_remote_create_merges_server_fields() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/items");
            then.status(201)
                .header("content-type", "application/json")
                .body(r#"{"id": 99, "qr_url": "https://cdn.example/qr/99.png"}"#);
        })
        .await;
    let temp = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());

    let state = app::setup(SetupOptions {
        gateway_url: Some(server.url("/api")),
        sinks: Sinks {
            notifier: notifier.clone(),
            ..Sinks::default()
        },
        clock: frozen_clock(),
        ..SetupOptions::new(temp.path().to_path_buf())
    })
    .await
    .unwrap();

    let mut form = ItemForm::new(state.codes.clone(), Arc::new(NoDisplay));
    form.open_new();
    form.on_name_changed("Proyektor");
    let saved = state
        .items
        .submit(
            &mut form,
            ItemDraft {
                name: "Proyektor".to_string(),
                condition: Condition::Good,
                category: "Elektronik".to_string(),
                registered_on: "2024-03-15".to_string(),
                image: Some(ImageRef::from("https://cdn.example/p.jpg")),
            },
        )
        .await
        .unwrap()
        .unwrap();

    create.assert_async().await;
    assert_eq!(saved.id.as_str(), "99");
    assert_eq!(saved.qr.as_deref(), Some("https://cdn.example/qr/99.png"));
    assert_eq!(notifier.notices()[0].outcome, Some(SyncOutcome::Server));
}

#[tokio::test]
async fn test_backup_and_restore_workflow() {
    let temp = TempDir::new().unwrap();
    let state = app::setup(SetupOptions {
        clock: frozen_clock(),
        ..SetupOptions::new(temp.path().to_path_buf())
    })
    .await
    .unwrap();

    state
        .items
        .controller()
        .add(item("A", "Kamera", "2024-01-01"))
        .await
        .unwrap();
    let backup_path = state.backup_service.create_backup().await.unwrap();

    let id = state.items.controller().records().await[0].id.clone();
    state.items.controller().remove(&id).await.unwrap();
    assert!(state.items.controller().is_empty().await);

    state.backup_service.restore_backup(&backup_path).await.unwrap();

    let reopened = app::setup(SetupOptions {
        clock: frozen_clock(),
        ..SetupOptions::new(temp.path().to_path_buf())
    })
    .await
    .unwrap();
    let items = reopened.items.controller().records().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Kamera");

    let backups = reopened.backup_service.list_backups().await.unwrap();
    assert_eq!(backups.len(), 1);
}
