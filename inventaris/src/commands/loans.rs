//! Loan commands

use super::terminal::{print_loans, TerminalConfirm, TerminalSinks};
use super::{write_output, ListArgs};
use crate::app::AppState;
use crate::database::RecordId;
use crate::error::{AppError, Result};
use crate::qr::FrameDecoder;
use crate::services::LoanDraft;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum LoansCmd {
    /// Show the loan history
    List(ListArgs),
    /// Record a new loan
    Add(LoanAddArgs),
    /// Mark a loan returned
    Return {
        id: String,
    },
    /// Delete a loan
    Remove {
        id: String,
    },
    /// Export the loan history as CSV
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct LoanAddArgs {
    /// Item code
    #[arg(long, conflicts_with = "qr")]
    pub code: Option<String>,
    /// Text read from an item's QR label
    #[arg(long)]
    pub qr: Option<String>,
    #[arg(long)]
    pub borrower: String,
    /// Division of the borrower
    #[arg(long, default_value = "")]
    pub group: String,
    /// Borrow time (defaults to now)
    #[arg(long)]
    pub borrowed_at: Option<String>,
    /// Planned return date
    #[arg(long)]
    pub return_due: Option<String>,
    #[arg(long, default_value = "")]
    pub notes: String,
}

/// Hands a QR payload captured elsewhere to the scan flow
struct ScannedPayload(String);

impl FrameDecoder for ScannedPayload {
    fn decode_frame(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

pub async fn run(
    cmd: LoansCmd,
    state: &AppState,
    sinks: &TerminalSinks,
    confirm: &TerminalConfirm,
) -> Result<()> {
    let desk = &state.loans;
    let controller = desk.controller();

    match cmd {
        LoansCmd::List(args) => {
            desk.load_history().await?;
            args.apply(controller).await;
            let page = match sinks.loans.take() {
                Some(page) => page,
                None => controller.visible_page().await,
            };
            print_loans(&page, state.clock.as_ref());
        }
        LoansCmd::Add(args) => {
            let item_code = match args.qr {
                Some(payload) => match desk.scan(&ScannedPayload(payload)).await? {
                    Some(item) => {
                        println!("Barang: {} ({})", item.name, item.code);
                        item.code
                    }
                    None => return Err(AppError::validation("Kode QR tidak dikenali")),
                },
                None => args.code.unwrap_or_default(),
            };

            let loan = desk
                .submit(LoanDraft {
                    item_code,
                    borrower: args.borrower,
                    group: args.group,
                    borrowed_at: args.borrowed_at,
                    return_due: args.return_due,
                    photo: None,
                    notes: args.notes,
                })
                .await?;
            println!("Peminjaman {} dicatat", loan.id);
        }
        LoansCmd::Return { id } => match desk.mark_returned(&RecordId::new(id.clone())).await? {
            Some(loan) => println!("Peminjaman {} {}", loan.id, loan.status.as_str()),
            None => println!("Peminjaman {} tidak ditemukan", id),
        },
        LoansCmd::Remove { id } => {
            if !desk.remove(&RecordId::new(id), confirm).await? {
                println!("Tidak ada yang dihapus");
            }
        }
        LoansCmd::Export { out } => {
            desk.resolve_item_names().await?;
            let csv = controller.export_csv().await?;
            write_output(out.as_deref(), &csv).await?;
        }
    }

    Ok(())
}
