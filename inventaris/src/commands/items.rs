//! Item registry commands

use super::terminal::{print_items, TerminalConfirm, TerminalSinks};
use super::{write_output, ListArgs};
use crate::app::AppState;
use crate::database::{Condition, ImageRef, RecordId};
use crate::error::Result;
use crate::qr::{ItemForm, NoDisplay};
use crate::services::ItemDraft;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum ItemsCmd {
    /// Show the registry table
    List(ListArgs),
    /// Register a new item; its code is generated from the current time
    Add(ItemAddArgs),
    /// Edit an item; the code printed on its label stays the same
    Edit(ItemEditArgs),
    /// Delete an item
    Remove {
        id: String,
    },
    /// Export the registry as CSV
    Export {
        /// Spreadsheet layout (BOM, photo links column)
        #[arg(long)]
        spreadsheet: bool,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct ItemAddArgs {
    #[arg(long)]
    pub name: String,
    /// baik, rusak or perbaikan
    #[arg(long, default_value = "baik")]
    pub condition: Condition,
    #[arg(long, default_value = "")]
    pub category: String,
    /// Registration date (defaults to today)
    #[arg(long)]
    pub date: Option<String>,
    /// Photo link or data URI
    #[arg(long)]
    pub image: Option<String>,
}

#[derive(Args)]
pub struct ItemEditArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub condition: Option<Condition>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub image: Option<String>,
}

pub async fn run(
    cmd: ItemsCmd,
    state: &AppState,
    sinks: &TerminalSinks,
    confirm: &TerminalConfirm,
) -> Result<()> {
    let controller = state.items.controller();

    match cmd {
        ItemsCmd::List(args) => {
            args.apply(controller).await;
            let page = match sinks.items.take() {
                Some(page) => page,
                None => controller.visible_page().await,
            };
            print_items(&page);
        }
        ItemsCmd::Add(args) => {
            let mut form = ItemForm::new(state.codes.clone(), Arc::new(NoDisplay));
            form.open_new();
            form.on_name_changed(&args.name);

            let registered_on = args
                .date
                .unwrap_or_else(|| state.clock.now().format("%Y-%m-%d").to_string());
            let draft = ItemDraft {
                name: args.name,
                condition: args.condition,
                category: args.category,
                registered_on,
                image: args.image.map(ImageRef::from),
            };

            if let Some(item) = state.items.submit(&mut form, draft).await? {
                println!("{}  {}", item.code, item.name);
                if let Some(qr) = &item.qr {
                    println!("QR: {}", qr);
                }
            }
        }
        ItemsCmd::Edit(args) => {
            let id = RecordId::new(args.id);
            let Some(current) = controller.get(&id).await else {
                println!("Item {} tidak ditemukan", id);
                return Ok(());
            };

            let mut form = ItemForm::new(state.codes.clone(), Arc::new(NoDisplay));
            form.open_edit(&current);
            if let Some(name) = &args.name {
                form.on_name_changed(name);
            }

            let draft = ItemDraft {
                name: args.name.unwrap_or(current.name),
                condition: args.condition.unwrap_or(current.condition),
                category: args.category.unwrap_or(current.category),
                registered_on: args.date.unwrap_or(current.registered_on),
                image: args.image.map(ImageRef::from).or(current.image),
            };

            match state.items.submit(&mut form, draft).await? {
                Some(item) => println!("{}  {}", item.code, item.name),
                None => println!("Item {} tidak ditemukan", id),
            }
        }
        ItemsCmd::Remove { id } => {
            let id = RecordId::new(id);
            if !controller.confirm_and_remove(&id, confirm).await? {
                println!("Tidak ada yang dihapus");
            }
        }
        ItemsCmd::Export { spreadsheet, out } => {
            let csv = if spreadsheet {
                state.items.export_spreadsheet().await?
            } else {
                controller.export_csv().await?
            };
            write_output(out.as_deref(), &csv).await?;
        }
    }

    Ok(())
}
