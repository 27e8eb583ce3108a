// Inventaris - inventory registry and loan tracking
// Entry point and application setup

use anyhow::Context;
use clap::Parser;
use inventaris::app::{self, SetupOptions};
use inventaris::commands::{self, Command, TerminalConfirm, TerminalSinks};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inventaris", version, about = "Inventory registry and loan tracking")]
struct Cli {
    /// Data directory (database, settings, backups)
    #[arg(long, env = "INVENTARIS_DATA_DIR", default_value = "inventaris-data")]
    data_dir: PathBuf,
    /// Remote API base URL, e.g. https://host/api (overrides settings)
    #[arg(long, global = true)]
    gateway: Option<String>,
    /// Work on local data only
    #[arg(long, global = true, conflicts_with = "gateway")]
    offline: bool,
    /// Answer yes to every confirmation
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventaris=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::info!("Starting inventaris");

    let sinks = TerminalSinks::new();
    let state = app::setup(SetupOptions {
        gateway_url: cli.gateway,
        offline: cli.offline,
        sinks: sinks.as_app_sinks(),
        ..SetupOptions::new(cli.data_dir.clone())
    })
    .await
    .with_context(|| format!("failed to open data directory {}", cli.data_dir.display()))?;

    let confirm = TerminalConfirm::new(cli.yes);
    commands::run(cli.command, &state, &sinks, &confirm).await?;

    Ok(())
}
