//! Filter, sort and page computation
//!
//! Everything here is a pure function of the collection and the view
//! state. The stored collection keeps insertion order; sorting only
//! affects what is shown.

use super::record::{column_text, field_texts, Record};
use crate::clock::date_sort_key;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::database::{SortDir, SortSpec, ViewMeta};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Lower-cased, trimmed filter text; empty shows everything
    pub filter: String,
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<SortSpec>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl ViewState {
    pub fn from_meta(meta: &ViewMeta) -> Self {
        Self {
            filter: meta
                .filter
                .as_deref()
                .map(normalize_filter)
                .unwrap_or_default(),
            page: meta.page.filter(|p| *p > 0).unwrap_or(1),
            page_size: meta
                .page_size
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            sort: meta.sort.clone().filter(|s| !s.key.is_empty()),
        }
    }

    pub fn to_meta(&self) -> ViewMeta {
        ViewMeta {
            page_size: Some(self.page_size),
            page: Some(self.page),
            sort: self.sort.clone(),
            filter: (!self.filter.is_empty()).then(|| self.filter.clone()),
        }
    }

    /// Same column flips direction; a new column starts ascending
    pub fn toggle_sort(&mut self, column: &str) {
        let dir = match &self.sort {
            Some(current) if current.key == column => current.dir.toggled(),
            _ => SortDir::Asc,
        };
        self.sort = Some(SortSpec {
            key: column.to_string(),
            dir,
        });
    }

    /// Direction shown on a column header, `None` for unsorted columns
    pub fn sort_indicator(&self, column: &str) -> Option<SortDir> {
        self.sort
            .as_ref()
            .filter(|s| s.key == column)
            .map(|s| s.dir)
    }

    /// Keep the page within `1..=total_pages` for the given row count
    pub fn clamp(&mut self, filtered_count: usize) {
        let total = total_pages(filtered_count, self.page_size);
        self.page = self.page.clamp(1, total);
    }
}

pub(crate) fn normalize_filter(text: &str) -> String {
    text.trim().to_lowercase()
}

/// One rendered page of a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisiblePage<R> {
    pub rows: Vec<R>,
    pub total_pages: usize,
    pub current_page: usize,
    /// 1-based number of the first row, for the "No" column
    pub first_row_number: usize,
    pub filtered_count: usize,
}

/// `max(1, ceil(count / page_size))`
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

fn matches_filter<R: Record>(record: &R, filter: &str) -> bool {
    filter.is_empty()
        || field_texts(record)
            .iter()
            .any(|text| text.to_lowercase().contains(filter))
}

fn sort_key<R: Record>(record: &R, column: &str) -> String {
    let text = column_text(record, column);
    if column == R::DATE_COLUMN {
        date_sort_key(&text)
    } else {
        text.to_lowercase()
    }
}

/// Records passing the filter, in display order
pub fn filtered_sorted<'a, R: Record>(records: &'a [R], view: &ViewState) -> Vec<&'a R> {
    let filtered = records.iter().filter(|r| matches_filter(*r, &view.filter));

    let Some(sort) = &view.sort else {
        return filtered.collect();
    };

    let mut keyed: Vec<(String, &R)> = filtered.map(|r| (sort_key(r, &sort.key), r)).collect();
    // sort_by is stable, so ties keep insertion order in both directions
    match sort.dir {
        SortDir::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortDir::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }
    keyed.into_iter().map(|(_, r)| r).collect()
}

pub fn visible_page<R: Record>(records: &[R], view: &ViewState) -> VisiblePage<R> {
    let ordered = filtered_sorted(records, view);
    let filtered_count = ordered.len();
    let page_size = view.page_size.max(1);
    let total_pages = total_pages(filtered_count, page_size);
    let current_page = view.page.clamp(1, total_pages);
    let start = (current_page - 1) * page_size;

    VisiblePage {
        rows: ordered
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect(),
        total_pages,
        current_page,
        first_row_number: start + 1,
        filtered_count,
    }
}
