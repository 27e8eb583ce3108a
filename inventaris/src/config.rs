//! Application configuration constants
//!
//! Central location for storage keys, view defaults and resource limits
//! used throughout the application.

// ===== Storage Keys =====

/// Store key holding the item registry collection
pub const ITEMS_KEY: &str = "dataBarang";
/// Store key holding the loan collection
pub const LOANS_KEY: &str = "peminjaman";
/// Store key holding archived loan history (carried through backups only)
pub const HISTORY_KEY: &str = "riwayat";
/// Suffix appended to a collection key to form its view-state key
pub const META_SUFFIX: &str = ":meta";

/// Build the companion metadata key for a collection key
pub fn meta_key(key: &str) -> String {
    format!("{}{}", key, META_SUFFIX)
}

// ===== View Defaults =====

/// Page size used when none is stored or the requested one is invalid
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Number of page buttons rendered on each side of the current page
pub const PAGER_WINDOW: usize = 2;

/// Number of loans shown in the dashboard's recent list
pub const RECENT_LOANS_LIMIT: usize = 5;

/// Month labels used for report rows and chart axes
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

// ===== Item Codes =====

/// Prefix of generated item codes ("ITEM-<unix seconds>")
pub const CODE_PREFIX: &str = "ITEM-";

/// Page the QR payload links to; the loan form reads `?code=`
pub const LOAN_FORM_PAGE: &str = "peminjaman.html";

// ===== Gateway =====

/// Default remote request timeout in milliseconds
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;

/// Minimum accepted gateway timeout (anything lower makes every call fail)
pub const MIN_GATEWAY_TIMEOUT_MS: u64 = 250;

/// User agent sent with every gateway request
pub const GATEWAY_USER_AGENT: &str = concat!("inventaris/", env!("CARGO_PKG_VERSION"));

// ===== Backups =====

/// Application name written into backup documents
pub const APP_NAME: &str = "UKM CINEMA Inventory";

/// Number of backup files kept when retention is applied
pub const DEFAULT_BACKUP_RETENTION: usize = 10;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "db.sqlite";
