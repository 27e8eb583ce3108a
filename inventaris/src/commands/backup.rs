//! Backup-related commands
//!
//! Commands for creating, listing and restoring backups.

use crate::app::AppState;
use crate::error::{AppError, Result};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum BackupCmd {
    /// Write a backup of items, loans and history
    Create,
    /// List backups, newest first
    List,
    /// Restore every dataset from a backup file
    Restore {
        /// Backup file; a bare file name is looked up in the backups directory
        path: PathBuf,
    },
}

pub async fn run(cmd: BackupCmd, state: &AppState) -> Result<()> {
    let service = &state.backup_service;

    match cmd {
        BackupCmd::Create => {
            let path = service.create_backup().await?;
            println!("Backup dibuat: {}", path.display());
        }
        BackupCmd::List => {
            let backups = service.list_backups().await?;
            if backups.is_empty() {
                println!("Belum ada backup di {}", service.backups_dir().display());
            }
            for backup in backups {
                println!("{:<40} {:>10} bytes", backup.file_name, backup.size);
            }
        }
        BackupCmd::Restore { path } => {
            let path = if path.exists() {
                path
            } else {
                service.backups_dir().join(&path)
            };
            if !path.is_file() {
                return Err(AppError::Restore(format!(
                    "Backup file not found: {}",
                    path.display()
                )));
            }

            let document = service.restore_backup(&path).await?;
            println!(
                "Data dari {} ({}) dipulihkan",
                document.timestamp, document.app
            );
        }
    }

    Ok(())
}
