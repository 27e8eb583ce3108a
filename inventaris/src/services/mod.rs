//! Services module
//!
//! Business logic that coordinates the list controllers, the store and the
//! remote gateway.

pub mod backup;
pub mod dashboard;
pub mod items;
pub mod loans;
pub mod report;
pub mod settings;

pub use backup::{BackupDocument, BackupInfo, BackupService};
pub use dashboard::{DashboardService, DashboardSummary};
pub use items::{ItemDraft, ItemPolicy, ItemRegistry};
pub use loans::{LoanDesk, LoanDraft, LoanPolicy};
pub use report::{MonthlyRow, ReportEngine, ReportService, YearSeries};
pub use settings::{AppSettings, SettingsService};
