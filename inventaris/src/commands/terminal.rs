//! Terminal rendering for the CLI
//!
//! Controllers render after every state change; the CLI keeps only the
//! latest page and prints it once the command is done.

use crate::clock::Clock;
use crate::controller::{PagerItem, VisiblePage};
use crate::database::{Item, Loan};
use crate::services::{MonthlyRow, YearSeries};
use crate::sink::{Confirm, Notice, Notifier, RenderSink, ReportSink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Keeps the most recently rendered page
pub struct LatestPage<R> {
    page: Mutex<Option<VisiblePage<R>>>,
}

impl<R> Default for LatestPage<R> {
    fn default() -> Self {
        Self {
            page: Mutex::new(None),
        }
    }
}

impl<R: Clone> LatestPage<R> {
    pub fn take(&self) -> Option<VisiblePage<R>> {
        self.page.lock().ok().and_then(|mut page| page.take())
    }
}

impl<R: Clone + Send + Sync> RenderSink<R> for LatestPage<R> {
    fn render(&self, page: &VisiblePage<R>) {
        if let Ok(mut latest) = self.page.lock() {
            *latest = Some(page.clone());
        }
    }
}

/// Prints notices as they arrive
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        println!("» {}", notice);
    }
}

/// Prints the monthly table and a bar chart of the year
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalReport;

impl ReportSink for TerminalReport {
    fn render_rows(&self, rows: &[MonthlyRow]) {
        if rows.is_empty() {
            println!("Tidak ada peminjaman pada tahun ini");
            return;
        }

        println!(
            "{:<10} {:>6} {:>13} {:>15} {:>10}",
            "Bulan", "Total", "Dikembalikan", "Masih Dipinjam", "Terlambat"
        );
        for row in rows {
            println!(
                "{:<10} {:>6} {:>13} {:>15} {:>10}",
                row.label, row.total, row.returned, row.active, row.overdue
            );
        }
    }

    fn render_chart(&self, series: &YearSeries) {
        println!();
        println!("Peminjaman {}", series.year);
        for row in &series.months {
            let label = row.label.split_whitespace().next().unwrap_or_default();
            println!("{:<4} {:<30} {}", label, "#".repeat(row.total.min(30)), row.total);
        }
    }
}

/// Confirmation answered by `--yes` or by reading stdin
pub struct TerminalConfirm {
    assume_yes: bool,
}

impl TerminalConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stdout = tokio::io::stdout();
        let prompt = format!("{} [y/N] ", message);
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            return false;
        }

        let mut answer = String::new();
        match BufReader::new(tokio::io::stdin()).read_line(&mut answer).await {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "ya" | "yes"),
            Err(e) => {
                tracing::warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}

/// Sinks shared by the CLI and the application state
pub struct TerminalSinks {
    pub items: Arc<LatestPage<Item>>,
    pub loans: Arc<LatestPage<Loan>>,
}

impl TerminalSinks {
    pub fn new() -> Self {
        Self {
            items: Arc::new(LatestPage::default()),
            loans: Arc::new(LatestPage::default()),
        }
    }

    pub fn as_app_sinks(&self) -> crate::app::Sinks {
        crate::app::Sinks {
            items: self.items.clone(),
            loans: self.loans.clone(),
            report: Arc::new(TerminalReport),
            notifier: Arc::new(TerminalNotifier),
        }
    }
}

impl Default for TerminalSinks {
    fn default() -> Self {
        Self::new()
    }
}

pub fn print_items(page: &VisiblePage<Item>) {
    println!(
        "{:>4}  {:<20} {:<28} {:<10} {:<14} {:<12}",
        "No", "Kode", "Nama", "Kondisi", "Jenis", "Tanggal"
    );
    for (offset, item) in page.rows.iter().enumerate() {
        println!(
            "{:>4}  {:<20} {:<28} {:<10} {:<14} {:<12}",
            page.first_row_number + offset,
            item.code,
            item.name,
            item.condition.label(),
            item.category,
            item.registered_on
        );
    }
    print_footer(page.current_page, page.total_pages, page.filtered_count);
}

pub fn print_loans(page: &VisiblePage<Loan>, clock: &dyn Clock) {
    let now = clock.now();
    println!(
        "{:>4}  {:<16} {:<20} {:<16} {:<18} {:<12} {:<10}",
        "No", "Kode", "Barang", "Peminjam", "Tanggal Pinjam", "Kembali", "Status"
    );
    for (offset, loan) in page.rows.iter().enumerate() {
        println!(
            "{:>4}  {:<16} {:<20} {:<16} {:<18} {:<12} {:<10}",
            page.first_row_number + offset,
            loan.item_code,
            loan.item_name.as_deref().unwrap_or_default(),
            loan.borrower,
            loan.borrowed_at.as_deref().unwrap_or("-"),
            loan.return_due.as_deref().unwrap_or("-"),
            loan.display_status(now).label()
        );
    }
    print_footer(page.current_page, page.total_pages, page.filtered_count);
}

fn print_footer(current_page: usize, total_pages: usize, filtered_count: usize) {
    let pager: Vec<String> = crate::controller::pager(current_page, total_pages)
        .into_iter()
        .map(|item| match item {
            PagerItem::Prev { disabled: true, .. } | PagerItem::Next { disabled: true, .. } => {
                " ".to_string()
            }
            PagerItem::Prev { .. } => "<".to_string(),
            PagerItem::Next { .. } => ">".to_string(),
            PagerItem::Page { number, current: true } => format!("[{}]", number),
            PagerItem::Page { number, .. } => number.to_string(),
            PagerItem::Ellipsis => "…".to_string(),
        })
        .collect();

    println!();
    println!(
        "{} baris, halaman {} dari {}  {}",
        filtered_count,
        current_page,
        total_pages,
        pager.join(" ")
    );
}
