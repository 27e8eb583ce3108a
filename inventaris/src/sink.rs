//! Outbound collaborators
//!
//! The core never draws anything itself. Tables, charts, toasts and
//! confirmation prompts are supplied by the caller through these traits.

use crate::controller::VisiblePage;
use crate::gateway::Resource;
use crate::services::report::{MonthlyRow, YearSeries};
use async_trait::async_trait;
use std::fmt;

/// Receives the visible page after every state change
pub trait RenderSink<R>: Send + Sync {
    fn render(&self, page: &VisiblePage<R>);
}

/// Receives report table rows and the yearly chart series
pub trait ReportSink: Send + Sync {
    fn render_rows(&self, rows: &[MonthlyRow]);

    fn render_chart(&self, series: &YearSeries);
}

/// Transient user notification
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Yes/no confirmation before destructive actions
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Added,
    Updated,
    Removed,
}

/// Which persistence path a mutation took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The gateway accepted the write
    Server,
    /// The gateway failed; the write is local only
    Offline,
    /// No gateway is configured
    LocalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub action: Action,
    pub resource: Resource,
    pub outcome: Option<SyncOutcome>,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            Action::Added => "ditambahkan",
            Action::Updated => "diperbarui",
            Action::Removed => "dihapus",
        };
        write!(f, "{} {}", self.resource.label(), verb)?;

        match self.outcome {
            Some(SyncOutcome::Server) => write!(f, " (server)"),
            Some(SyncOutcome::Offline) => write!(f, " (offline)"),
            Some(SyncOutcome::LocalOnly) | None => Ok(()),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<R> RenderSink<R> for NullSink {
    fn render(&self, _page: &VisiblePage<R>) {}
}

impl ReportSink for NullSink {
    fn render_rows(&self, _rows: &[MonthlyRow]) {}

    fn render_chart(&self, _series: &YearSeries) {}
}

impl Notifier for NullSink {
    fn notify(&self, _notice: Notice) {}
}

/// Writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        tracing::info!("{}", notice);
    }
}

/// Answers every confirmation with a fixed value
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!("Confirmation '{}' answered with {}", message, self.0);
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let offline = Notice {
            action: Action::Added,
            resource: Resource::Items,
            outcome: Some(SyncOutcome::Offline),
        };
        let removed = Notice {
            action: Action::Removed,
            resource: Resource::Loans,
            outcome: None,
        };

        assert_eq!(offline.to_string(), "Item ditambahkan (offline)");
        assert_eq!(removed.to_string(), "Peminjaman dihapus");
    }

    #[tokio::test]
    async fn test_auto_confirm() {
        assert!(AutoConfirm(true).confirm("Hapus?").await);
        assert!(!AutoConfirm(false).confirm("Hapus?").await);
    }
}
