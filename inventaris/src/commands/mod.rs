//! CLI commands
//!
//! This module organizes commands into logical submodules:
//! - `items`: Item registry listing, intake, edits and export
//! - `loans`: Loan intake, returns, history and export
//! - `report`: Monthly report table, chart and CSV export
//! - `backup`: Backup and restore operations
//! - `settings`: Application settings
//! - `terminal`: Terminal sinks used by every command

pub mod backup;
pub mod items;
pub mod loans;
pub mod report;
pub mod settings;
pub mod terminal;

pub use backup::BackupCmd;
pub use items::ItemsCmd;
pub use loans::LoansCmd;
pub use report::ReportCmd;
pub use settings::SettingsCmd;
pub use terminal::{TerminalConfirm, TerminalSinks};

use crate::app::AppState;
use crate::controller::{ListController, Record};
use crate::error::Result;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Subcommand)]
pub enum Command {
    /// Item registry
    #[command(subcommand)]
    Items(ItemsCmd),
    /// Loans
    #[command(subcommand)]
    Loans(LoansCmd),
    /// Monthly loan report
    #[command(subcommand)]
    Report(ReportCmd),
    /// Counts and the most recent loans
    Dashboard,
    /// Backups of all datasets
    #[command(subcommand)]
    Backup(BackupCmd),
    /// Application settings
    #[command(subcommand)]
    Settings(SettingsCmd),
    /// Replace the loans with generated sample data
    SeedLoans {
        /// Year to generate loans for (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Table view options shared by the list commands; they are persisted
/// with the collection
#[derive(Args, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive text filter ("" clears it)
    #[arg(long)]
    pub filter: Option<String>,
    /// Column to sort by; repeating the current column flips the direction
    #[arg(long)]
    pub sort: Option<String>,
    /// Page to show (1-based)
    #[arg(long)]
    pub page: Option<usize>,
    /// Rows per page
    #[arg(long)]
    pub page_size: Option<i64>,
}

impl ListArgs {
    pub async fn apply<R: Record>(&self, controller: &ListController<R>) {
        if let Some(filter) = &self.filter {
            controller.set_filter(filter).await;
        }
        if let Some(size) = self.page_size {
            controller.set_page_size(size).await;
        }
        if let Some(column) = &self.sort {
            controller.set_sort(column).await;
        }
        if let Some(page) = self.page {
            controller.set_page(page).await;
        }
    }
}

/// Run one command against the initialized application
pub async fn run(
    command: Command,
    state: &AppState,
    sinks: &TerminalSinks,
    confirm: &TerminalConfirm,
) -> Result<()> {
    match command {
        Command::Items(cmd) => items::run(cmd, state, sinks, confirm).await,
        Command::Loans(cmd) => loans::run(cmd, state, sinks, confirm).await,
        Command::Report(cmd) => report::run(cmd, state).await,
        Command::Dashboard => dashboard(state).await,
        Command::Backup(cmd) => backup::run(cmd, state).await,
        Command::Settings(cmd) => settings::run(cmd, state).await,
        Command::SeedLoans { year } => report::seed_loans(state, year, confirm).await,
    }
}

async fn dashboard(state: &AppState) -> Result<()> {
    let summary = state.dashboard.summary().await?;

    println!("Total barang       : {}", summary.counts.items);
    println!("Total peminjaman   : {}", summary.counts.loans);
    println!("Sedang dipinjam    : {}", summary.counts.active);
    println!("Selesai            : {}", summary.counts.completed);

    println!();
    println!("Peminjaman terbaru");
    if summary.recent.is_empty() {
        println!("  (belum ada)");
    }
    for recent in &summary.recent {
        println!(
            "  {:<24} {:<18} {:<8} cari: {}",
            recent.item, recent.borrower, recent.estimate, recent.history_query
        );
    }
    Ok(())
}

/// Write `content` to `out`, or to stdout when no path is given
pub(crate) async fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            println!("Disimpan ke {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
