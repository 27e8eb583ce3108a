//! Settings-related commands
//!
//! Changes are written to `settings.json` and take effect on the next run.

use crate::app::AppState;
use crate::error::Result;
use crate::services::settings::{BackupSettings, GatewaySettings, QrSettings, ViewSettings};
use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum SettingsCmd {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set(SettingsSetArgs),
}

#[derive(Args)]
pub struct SettingsSetArgs {
    /// Remote API base URL ("" disables the gateway)
    #[arg(long)]
    pub gateway_url: Option<String>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Default rows per page for lists without a stored page size
    #[arg(long)]
    pub page_size: Option<usize>,
    /// Where the loan form is hosted, used in QR links
    #[arg(long)]
    pub link_base: Option<String>,
    /// Number of backup files to keep
    #[arg(long)]
    pub retention: Option<usize>,
}

pub async fn run(cmd: SettingsCmd, state: &AppState) -> Result<()> {
    let service = &state.settings_service;

    match cmd {
        SettingsCmd::Show => {
            let settings = service.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsCmd::Set(args) => {
            if args.gateway_url.is_some() || args.timeout_ms.is_some() {
                let current = service.get_gateway().await?;
                service
                    .update_gateway(GatewaySettings {
                        base_url: args.gateway_url.or(current.base_url),
                        timeout_ms: args.timeout_ms.unwrap_or(current.timeout_ms),
                    })
                    .await?;
            }
            if let Some(page_size) = args.page_size {
                service.update_view(ViewSettings { page_size }).await?;
            }
            if let Some(link_base) = args.link_base {
                service.update_qr(QrSettings { link_base }).await?;
            }
            if let Some(retention_count) = args.retention {
                service
                    .update_backup(BackupSettings { retention_count })
                    .await?;
            }
            println!("Pengaturan disimpan");
        }
    }

    Ok(())
}
