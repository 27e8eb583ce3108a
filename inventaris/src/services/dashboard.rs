//! Dashboard summary

use crate::clock::{days_between, parse_timestamp};
use crate::config::{ITEMS_KEY, LOANS_KEY, RECENT_LOANS_LIMIT};
use crate::database::{Item, Loan, LoanStatus};
use crate::error::Result;
use crate::storage::Store;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub items: usize,
    pub loans: usize,
    pub active: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentLoan {
    /// Item name, or the code when the name is unknown
    pub item: String,
    pub borrower: String,
    /// `N hari`, `Aktif` or `-`
    pub estimate: String,
    /// Search text used to jump to the loan history
    pub history_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub counts: DashboardCounts,
    pub recent: Vec<RecentLoan>,
}

pub fn counts(items: &[Item], loans: &[Loan]) -> DashboardCounts {
    let active = loans
        .iter()
        .filter(|l| l.status == LoanStatus::Active)
        .count();
    DashboardCounts {
        items: items.len(),
        loans: loans.len(),
        active,
        completed: loans.len() - active,
    }
}

/// Loan duration estimate shown in the recent list
pub fn estimate(loan: &Loan) -> String {
    let span = loan
        .return_due
        .as_deref()
        .filter(|due| !due.trim().is_empty())
        .map(|due| {
            let start = loan.borrowed_at.as_deref().and_then(parse_timestamp);
            match (start, parse_timestamp(due)) {
                (Some(start), Some(end)) => format!("{} hari", days_between(start, end)),
                _ => "-".to_string(),
            }
        });

    match span {
        Some(span) => span,
        None if loan.status == LoanStatus::Active => "Aktif".to_string(),
        None => "-".to_string(),
    }
}

/// Most recent loans by borrow time, then creation time, newest first
pub fn recent_loans(loans: &[Loan], limit: usize) -> Vec<RecentLoan> {
    let mut ordered: Vec<&Loan> = loans.iter().collect();
    ordered.sort_by_key(|loan| std::cmp::Reverse(loan.effective_timestamp()));

    ordered
        .into_iter()
        .take(limit)
        .map(|loan| {
            let item = loan
                .item_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| loan.item_code.clone());
            let history_query = [loan.item_code.as_str(), item.as_str(), loan.borrower.as_str()]
                .into_iter()
                .find(|s| !s.is_empty())
                .unwrap_or_default()
                .to_string();

            RecentLoan {
                item,
                borrower: loan.borrower.clone(),
                estimate: estimate(loan),
                history_query,
            }
        })
        .collect()
}

pub struct DashboardService {
    store: Store,
}

impl DashboardService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        let items: Vec<Item> = self.store.read_collection(ITEMS_KEY).await?;
        let loans: Vec<Loan> = self.store.read_collection(LOANS_KEY).await?;

        let summary = DashboardSummary {
            counts: counts(&items, &loans),
            recent: recent_loans(&loans, RECENT_LOANS_LIMIT),
        };
        tracing::debug!("Dashboard: {:?}", summary.counts);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loan(id: u32, borrowed: Option<&str>, due: Option<&str>, status: &str) -> Loan {
        serde_json::from_value(json!({
            "id": id,
            "item_code": format!("ITEM-{}", id),
            "nama": format!("User {}", id),
            "tanggal_pinjam": borrowed,
            "tanggal_kembali": due,
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_counts() {
        let loans = vec![
            loan(1, Some("2024-03-01"), None, "aktif"),
            loan(2, Some("2024-03-02"), None, "selesai"),
            loan(3, Some("2024-03-03"), None, "terlambat"),
        ];

        let c = counts(&[], &loans);

        assert_eq!(c, DashboardCounts { items: 0, loans: 3, active: 2, completed: 1 });
    }

    #[test]
    fn test_estimate_variants() {
        assert_eq!(
            estimate(&loan(1, Some("2024-03-01T10:00"), Some("2024-03-04"), "selesai")),
            "3 hari"
        );
        assert_eq!(estimate(&loan(2, Some("2024-03-01"), None, "aktif")), "Aktif");
        assert_eq!(estimate(&loan(3, Some("2024-03-01"), None, "selesai")), "-");
    }

    #[test]
    fn test_recent_loans_newest_first() {
        let mut created_only = loan(7, None, None, "aktif");
        created_only.created_at = Some("2024-03-20T09:00:00".to_string());
        let mut loans: Vec<Loan> = (1..=6)
            .map(|i| loan(i, Some(&format!("2024-03-0{}", i)), None, "aktif"))
            .collect();
        loans.push(created_only);
        loans.push(loan(8, None, None, "aktif"));

        let recent = recent_loans(&loans, 5);

        let items: Vec<&str> = recent.iter().map(|r| r.item.as_str()).collect();
        assert_eq!(items, vec!["ITEM-7", "ITEM-6", "ITEM-5", "ITEM-4", "ITEM-3"]);
        assert_eq!(recent[0].history_query, "ITEM-7");
    }

    #[tokio::test]
    async fn test_summary_reads_store() {
        let store = Store::in_memory();
        store
            .write_collection(LOANS_KEY, &[loan(1, Some("2024-03-01"), None, "aktif")])
            .await
            .unwrap();

        let summary = DashboardService::new(store).summary().await.unwrap();

        assert_eq!(summary.counts.loans, 1);
        assert_eq!(summary.recent.len(), 1);
    }
}
