//! Monthly loan reports
//!
//! Loans are grouped into calendar-month buckets keyed `YYYY-MM` by borrow
//! time (creation time when the borrow time is missing or unreadable).
//! Buckets are derived on demand and never written back. Overdue counts
//! depend on "now", which every call receives explicitly.

use crate::clock::Clock;
use crate::config::{ITEMS_KEY, LOANS_KEY, MONTH_LABELS};
use crate::database::{Item, Loan, LoanStatus, RecordId};
use crate::error::Result;
use crate::export::to_csv;
use crate::gateway::{Gateway, Resource};
use crate::sink::ReportSink;
use crate::storage::Store;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const MONTH_DETAIL_HEADERS: [&str; 8] = [
    "No",
    "Kode",
    "Nama",
    "Peminjam",
    "Tanggal Pinjam",
    "Tanggal Kembali",
    "Status",
    "Keterangan",
];

const YEAR_SUMMARY_HEADERS: [&str; 5] = [
    "Bulan",
    "Total",
    "Dikembalikan",
    "Masih Dipinjam",
    "Terlambat",
];

/// Counts for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRow {
    /// `YYYY-MM`
    pub key: String,
    /// e.g. `Mar 2024`
    pub label: String,
    pub total: usize,
    pub returned: usize,
    pub active: usize,
    pub overdue: usize,
}

/// Twelve monthly rows, January first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSeries {
    pub year: i32,
    pub months: Vec<MonthlyRow>,
}

impl YearSeries {
    pub fn labels(&self) -> Vec<&'static str> {
        MONTH_LABELS.to_vec()
    }

    pub fn totals(&self) -> Vec<usize> {
        self.months.iter().map(|m| m.total).collect()
    }

    pub fn returned(&self) -> Vec<usize> {
        self.months.iter().map(|m| m.returned).collect()
    }

    pub fn active(&self) -> Vec<usize> {
        self.months.iter().map(|m| m.active).collect()
    }

    pub fn overdue(&self) -> Vec<usize> {
        self.months.iter().map(|m| m.overdue).collect()
    }
}

pub fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

fn month_label(key: &str) -> String {
    let parsed = key
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<usize>().ok()?)));

    match parsed {
        Some((year, month)) if (1..=12).contains(&month) => {
            format!("{} {}", MONTH_LABELS[month - 1], year)
        }
        _ => key.to_string(),
    }
}

/// Years offered in the report year picker: next year down to two back
pub fn year_options(now: NaiveDateTime) -> Vec<i32> {
    let year = now.year();
    (year - 2..=year + 1).rev().collect()
}

/// Month buckets for one pass over the loans
#[derive(Debug, Clone, Default)]
pub struct ReportEngine {
    buckets: BTreeMap<String, Vec<Loan>>,
}

impl ReportEngine {
    /// Group loans by month, optionally for one item code only. Loans with
    /// no readable timestamp are left out.
    pub fn process(loans: &[Loan], item_code: Option<&str>) -> Self {
        let item_code = item_code.map(str::trim).filter(|c| !c.is_empty());
        let mut buckets: BTreeMap<String, Vec<Loan>> = BTreeMap::new();
        let mut skipped = 0usize;

        for loan in loans {
            if item_code.is_some_and(|code| loan.item_code != code) {
                continue;
            }
            match loan.effective_timestamp() {
                Some(ts) => buckets
                    .entry(month_key(ts.year(), ts.month()))
                    .or_default()
                    .push(loan.clone()),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!("{} loans without a readable date left out of the report", skipped);
        }

        Self { buckets }
    }

    /// Bucket keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Loans in one bucket, in input order
    pub fn month_details(&self, key: &str) -> &[Loan] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn monthly_row(&self, key: &str, now: NaiveDateTime) -> MonthlyRow {
        let loans = self.month_details(key);
        let active = loans
            .iter()
            .filter(|l| l.status == LoanStatus::Active)
            .count();

        MonthlyRow {
            key: key.to_string(),
            label: month_label(key),
            total: loans.len(),
            returned: loans.len() - active,
            active,
            overdue: loans.iter().filter(|l| l.is_overdue(now)).count(),
        }
    }

    /// Report table rows for one year, newest month first, months without
    /// loans omitted
    pub fn monthly_rows(&self, year: i32, now: NaiveDateTime) -> Vec<MonthlyRow> {
        let prefix = format!("{:04}-", year);
        self.buckets
            .keys()
            .rev()
            .filter(|key| key.starts_with(&prefix))
            .map(|key| self.monthly_row(key, now))
            .collect()
    }

    pub fn year_series(&self, year: i32, now: NaiveDateTime) -> YearSeries {
        YearSeries {
            year,
            months: (1..=12)
                .map(|month| self.monthly_row(&month_key(year, month), now))
                .collect(),
        }
    }

    /// Detail CSV for one month
    pub fn export_month(&self, key: &str) -> Result<String> {
        let rows = self.month_details(key).iter().enumerate().map(|(index, loan)| {
            vec![
                (index + 1).to_string(),
                loan.item_code.clone(),
                loan.item_name.clone().unwrap_or_default(),
                loan.borrower.clone(),
                loan.borrowed_at.clone().unwrap_or_default(),
                loan.return_due.clone().unwrap_or_default(),
                loan.status.as_str().to_string(),
                loan.notes.clone(),
            ]
        });
        to_csv(&MONTH_DETAIL_HEADERS, rows)
    }

    /// Summary CSV with one row per month of the year
    pub fn export_year(&self, year: i32, now: NaiveDateTime) -> Result<String> {
        let rows = self.year_series(year, now).months.into_iter().map(|row| {
            vec![
                row.key,
                row.total.to_string(),
                row.returned.to_string(),
                row.active.to_string(),
                row.overdue.to_string(),
            ]
        });
        to_csv(&YEAR_SUMMARY_HEADERS, rows)
    }
}

/// Loads loans and feeds the report sink
pub struct ReportService {
    store: Store,
    gateway: Option<Arc<dyn Gateway>>,
    sink: Arc<dyn ReportSink>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(
        store: Store,
        gateway: Option<Arc<dyn Gateway>>,
        sink: Arc<dyn ReportSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateway,
            sink,
            clock,
        }
    }

    /// Loans from the server when reachable, otherwise from the store
    pub async fn load_loans(&self) -> Result<Vec<Loan>> {
        if let Some(gateway) = &self.gateway {
            match gateway.list(Resource::Loans).await {
                Ok(values) => {
                    let loans: Vec<Loan> = values
                        .into_iter()
                        .filter_map(|value| serde_json::from_value(value).ok())
                        .collect();
                    tracing::debug!("Report uses {} remote loans", loans.len());
                    return Ok(loans);
                }
                Err(e) => tracing::warn!("Remote loans unavailable, reporting local data: {}", e),
            }
        }
        self.store.read_collection(LOANS_KEY).await
    }

    pub async fn build(&self, item_code: Option<&str>) -> Result<ReportEngine> {
        let loans = self.load_loans().await?;
        Ok(ReportEngine::process(&loans, item_code))
    }

    /// Build the report and render table and chart for `year`
    pub async fn show(&self, year: i32, item_code: Option<&str>) -> Result<ReportEngine> {
        let engine = self.build(item_code).await?;
        let now = self.clock.now();

        let rows = engine.monthly_rows(year, now);
        tracing::info!("Report {}: {} months with loans", year, rows.len());
        self.sink.render_rows(&rows);
        self.sink.render_chart(&engine.year_series(year, now));

        Ok(engine)
    }

    /// Replace the stored loans with generated sample data for `year`
    pub async fn seed_sample_loans<G: Rng>(&self, year: i32, rng: &mut G) -> Result<usize> {
        let items: Vec<Item> = self.store.read_collection(ITEMS_KEY).await?;
        let loans = sample_loans(year, &items, rng, self.clock.as_ref());
        self.store.write_collection(LOANS_KEY, &loans).await?;
        tracing::info!("Seeded {} sample loans for {}", loans.len(), year);
        Ok(loans.len())
    }
}

/// One to three loans per month of `year`, cycling through `items`
pub fn sample_loans<G: Rng>(year: i32, items: &[Item], rng: &mut G, clock: &dyn Clock) -> Vec<Loan> {
    let fallback: Vec<(String, String)> = vec![
        ("ITEM-1".to_string(), "Proyektor".to_string()),
        ("ITEM-2".to_string(), "Tripod".to_string()),
        ("ITEM-3".to_string(), "Kamera".to_string()),
    ];
    let pool: Vec<(String, String)> = if items.is_empty() {
        fallback
    } else {
        items.iter().map(|i| (i.code.clone(), i.name.clone())).collect()
    };

    let created_at = crate::clock::format_timestamp(clock.now());
    let base_id = clock.now_millis();
    let ten_am = NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut loans = Vec::new();

    for month in 1..=12u32 {
        let count = rng.gen_range(1..=3usize);
        for i in 0..count {
            let Some(day) = NaiveDate::from_ymd_opt(year, month, (i as u32 + 1).min(15)) else {
                continue;
            };
            let borrowed = day.and_time(ten_am);
            let returned = rng.gen_bool(0.4);
            let (code, name) = &pool[i % pool.len()];

            loans.push(Loan {
                id: RecordId::from_millis(base_id + loans.len() as i64),
                item_code: code.clone(),
                item_name: Some(name.clone()),
                borrower: format!("User {}", i + 1),
                group: format!("Divisi {}", i % 3 + 1),
                borrowed_at: Some(borrowed.format("%Y-%m-%dT%H:%M:%S").to_string()),
                return_due: returned
                    .then(|| (borrowed + Duration::days(3)).format("%Y-%m-%d").to_string()),
                status: if returned {
                    LoanStatus::Returned
                } else {
                    LoanStatus::Active
                },
                photo: None,
                notes: "Contoh".to_string(),
                created_at: Some(created_at.clone()),
            });
        }
    }

    loans
}
