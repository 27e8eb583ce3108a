//! Report commands

use super::terminal::TerminalConfirm;
use super::write_output;
use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::services::report::{month_key, year_options};
use crate::sink::Confirm;
use chrono::Datelike;
use clap::Subcommand;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ReportCmd {
    /// Monthly table and yearly chart
    Show {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
        /// Only loans of this item code
        #[arg(long)]
        item: Option<String>,
    },
    /// Export a month's loans, or the year summary when no month is given
    Export {
        #[arg(long)]
        year: Option<i32>,
        /// 1-12
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        item: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub async fn run(cmd: ReportCmd, state: &AppState) -> Result<()> {
    let now = state.clock.now();

    match cmd {
        ReportCmd::Show { year, item } => {
            let year = year.unwrap_or_else(|| now.year());
            let options: Vec<String> = year_options(now).iter().map(i32::to_string).collect();
            println!("Tahun tersedia: {}", options.join(", "));
            println!();
            state.reports.show(year, item.as_deref()).await?;
        }
        ReportCmd::Export {
            year,
            month,
            item,
            out,
        } => {
            let year = year.unwrap_or_else(|| now.year());
            let engine = state.reports.build(item.as_deref()).await?;
            let csv = match month {
                Some(month @ 1..=12) => engine.export_month(&month_key(year, month))?,
                Some(other) => {
                    return Err(AppError::validation(format!("Bulan tidak valid: {}", other)))
                }
                None => engine.export_year(year, now)?,
            };
            write_output(out.as_deref(), &csv).await?;
        }
    }

    Ok(())
}

/// Replace the stored loans with sample data for `year`
pub async fn seed_loans(state: &AppState, year: Option<i32>, confirm: &TerminalConfirm) -> Result<()> {
    let year = year.unwrap_or_else(|| state.clock.now().year());
    if !confirm
        .confirm(&format!("Ganti semua data peminjaman dengan contoh tahun {}?", year))
        .await
    {
        return Ok(());
    }

    let mut rng = StdRng::from_entropy();
    let count = state.reports.seed_sample_loans(year, &mut rng).await?;
    println!("{} peminjaman contoh dibuat untuk {}", count, year);
    Ok(())
}
