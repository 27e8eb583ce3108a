//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::clock::{Clock, SystemClock};
use crate::config::DATABASE_FILE;
use crate::controller::{ListController, Record};
use crate::database::{create_pool, Item, Loan, Repository};
use crate::error::Result;
use crate::gateway::{Gateway, HttpGateway};
use crate::qr::{CodeGenerator, TimestampCodes};
use crate::services::{
    AppSettings, BackupService, DashboardService, ItemPolicy, ItemRegistry, LoanDesk, LoanPolicy,
    ReportService, SettingsService,
};
use crate::sink::{LogNotifier, Notifier, NullSink, RenderSink, ReportSink};
use crate::storage::Store;
use std::path::PathBuf;
use std::sync::Arc;

/// Output collaborators handed to the controllers
#[derive(Clone)]
pub struct Sinks {
    pub items: Arc<dyn RenderSink<Item>>,
    pub loans: Arc<dyn RenderSink<Loan>>,
    pub report: Arc<dyn ReportSink>,
    pub notifier: Arc<dyn Notifier>,
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            items: Arc::new(NullSink),
            loans: Arc::new(NullSink),
            report: Arc::new(NullSink),
            notifier: Arc::new(LogNotifier),
        }
    }
}

/// Startup options
pub struct SetupOptions {
    pub app_data_dir: PathBuf,
    /// Overrides the configured gateway URL
    pub gateway_url: Option<String>,
    /// Skip the gateway even when one is configured
    pub offline: bool,
    pub sinks: Sinks,
    pub clock: Arc<dyn Clock>,
}

impl SetupOptions {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            app_data_dir,
            gateway_url: None,
            offline: false,
            sinks: Sinks::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings: AppSettings,
    pub store: Store,
    pub gateway: Option<Arc<dyn Gateway>>,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<dyn CodeGenerator>,
    pub items: Arc<ItemRegistry>,
    pub loans: Arc<LoanDesk>,
    pub reports: Arc<ReportService>,
    pub dashboard: Arc<DashboardService>,
    pub backup_service: BackupService,
    pub settings_service: SettingsService,
}

/// Application setup - called once on startup
pub async fn setup(options: SetupOptions) -> Result<AppState> {
    let SetupOptions {
        app_data_dir,
        gateway_url,
        offline,
        sinks,
        clock,
    } = options;

    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", app_data_dir);

    // Create necessary directories
    std::fs::create_dir_all(&app_data_dir)?;
    std::fs::create_dir_all(app_data_dir.join("backups"))?;

    let settings_service = SettingsService::new(app_data_dir.clone());
    let settings = settings_service.load().await?;

    let pool = create_pool(&app_data_dir.join(DATABASE_FILE)).await?;
    let store = Store::sqlite(Repository::new(pool));

    let gateway = if offline {
        tracing::info!("Offline mode, remote gateway disabled");
        None
    } else {
        build_gateway(gateway_url.as_deref().or(settings.gateway.base_url()), &settings)?
    };

    let codes: Arc<dyn CodeGenerator> = Arc::new(TimestampCodes::new(clock.clone()));

    let item_controller = ListController::<Item>::new(store.clone())
        .with_gateway(gateway.clone())
        .with_policy(Arc::new(ItemPolicy::new(
            codes.clone(),
            settings.qr.link_base.clone(),
        )))
        .with_sink(sinks.items)
        .with_notifier(sinks.notifier.clone())
        .with_clock(clock.clone());
    let loan_controller = ListController::<Loan>::new(store.clone())
        .with_gateway(gateway.clone())
        .with_policy(Arc::new(LoanPolicy::new(clock.clone())))
        .with_sink(sinks.loans)
        .with_notifier(sinks.notifier)
        .with_clock(clock.clone());

    let items = Arc::new(ItemRegistry::new(Arc::new(item_controller)));
    let loans = Arc::new(LoanDesk::new(Arc::new(loan_controller), items.clone()));

    load_with_page_size(&store, items.controller(), settings.view.page_size).await?;
    load_with_page_size(&store, loans.controller(), settings.view.page_size).await?;

    let reports = Arc::new(ReportService::new(
        store.clone(),
        gateway.clone(),
        sinks.report,
        clock.clone(),
    ));
    let dashboard = Arc::new(DashboardService::new(store.clone()));
    let backup_service = BackupService::new(
        store.clone(),
        &app_data_dir,
        settings.backup.retention_count,
    );

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        app_data_dir,
        settings,
        store,
        gateway,
        clock,
        codes,
        items,
        loans,
        reports,
        dashboard,
        backup_service,
        settings_service,
    })
}

fn build_gateway(base_url: Option<&str>, settings: &AppSettings) -> Result<Option<Arc<dyn Gateway>>> {
    match base_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => {
            tracing::info!("Remote gateway at {}", url);
            let gateway: Arc<dyn Gateway> =
                Arc::new(HttpGateway::new(url, settings.gateway.timeout_ms)?);
            Ok(Some(gateway))
        }
        None => {
            tracing::info!("No remote gateway configured, working locally");
            Ok(None)
        }
    }
}

/// Load a controller; a collection without a stored page size starts at
/// the configured one
async fn load_with_page_size<R: Record>(
    store: &Store,
    controller: &ListController<R>,
    page_size: usize,
) -> Result<()> {
    let stored = store.read_meta(R::STORAGE_KEY).await?.page_size;
    controller.load().await?;
    if stored.is_none() {
        controller.set_page_size(i64::try_from(page_size).unwrap_or_default()).await;
    }
    Ok(())
}
