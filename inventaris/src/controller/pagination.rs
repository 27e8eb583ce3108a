//! Pager control model

use crate::config::PAGER_WINDOW;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PagerItem {
    Prev { target: usize, disabled: bool },
    Page { number: usize, current: bool },
    Ellipsis,
    Next { target: usize, disabled: bool },
}

/// Buttons for the pager: prev, first page, a window around the current
/// page with ellipses for gaps, last page, next. Empty for a single page.
pub fn pager(current: usize, total_pages: usize) -> Vec<PagerItem> {
    if total_pages <= 1 {
        return Vec::new();
    }

    let current = current.clamp(1, total_pages);
    let page = |number: usize| PagerItem::Page {
        number,
        current: number == current,
    };

    let mut items = vec![
        PagerItem::Prev {
            target: current.saturating_sub(1).max(1),
            disabled: current <= 1,
        },
        page(1),
    ];

    let start = current.saturating_sub(PAGER_WINDOW).max(2);
    let end = (current + PAGER_WINDOW).min(total_pages - 1);

    if start > 2 {
        items.push(PagerItem::Ellipsis);
    }
    items.extend((start..=end).map(page));
    if end < total_pages - 1 {
        items.push(PagerItem::Ellipsis);
    }

    items.push(page(total_pages));
    items.push(PagerItem::Next {
        target: (current + 1).min(total_pages),
        disabled: current >= total_pages,
    });

    items
}
