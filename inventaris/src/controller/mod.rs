//! List controllers
//!
//! One generic controller drives both the item registry and the loan
//! history: filtering, sorting, paging, optimistic mutations, view-state
//! persistence and CSV export.

pub mod list;
pub mod pagination;
pub mod record;
pub mod view;

pub use list::{ListController, RecordPolicy};
pub use pagination::{pager, PagerItem};
pub use record::Record;
pub use view::{total_pages, ViewState, VisiblePage};
