//! Page arithmetic for the table view.
//!
//! [`compute`] is a pure function of `(total_rows, page_size, requested_page)`
//! so re-rendering a page is idempotent. Out-of-range requests are clamped,
//! never rejected.

use crate::constants::{MAX_VISIBLE_PAGES, PAGE_WINDOW_THRESHOLD};
use serde::Serialize;
use std::ops::Range;

/// The row window shown for one page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// 1-based page number after clamping
    pub page: usize,
    /// Number of pages; 0 for an empty table
    pub page_count: usize,
    /// Rows per page after clamping to >= 1
    pub page_size: usize,
    /// First row index of the window (inclusive)
    pub start: usize,
    /// Last row index of the window (exclusive)
    pub end: usize,
    pub total_rows: usize,
}

impl PageWindow {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based number of the first record shown, 0 when nothing is shown
    pub fn first_record(&self) -> usize {
        if self.is_empty() { 0 } else { self.start + 1 }
    }

    /// 1-based number of the last record shown
    pub fn last_record(&self) -> usize {
        self.end
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

/// Compute the clamped page and its row window
pub fn compute(total_rows: usize, page_size: usize, requested_page: i64) -> PageWindow {
    let page_size = page_size.max(1);
    let page_count = total_rows.div_ceil(page_size);

    let last_page = page_count.max(1) as i64;
    let page = requested_page.clamp(1, last_page) as usize;

    let (start, end) = if total_rows == 0 {
        (0, 0)
    } else {
        let start = (page - 1) * page_size;
        (start, (start + page_size).min(total_rows))
    };

    PageWindow {
        page,
        page_count,
        page_size,
        start,
        end,
        total_rows,
    }
}

/// Navigation strip for a page: numbered links plus jump and ellipsis markers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    /// Numbered pages shown around the current one
    pub pages: Vec<usize>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    /// Link to page 1 shown ahead of the strip
    pub first: bool,
    /// Gap between the first-page link and the strip
    pub leading_ellipsis: bool,
    /// Gap between the strip and the last-page link
    pub trailing_ellipsis: bool,
    /// Link to the last page shown after the strip
    pub last: bool,
}

/// Build the navigation strip.
///
/// At most [`MAX_VISIBLE_PAGES`] numbered links. The strip only slides when
/// the current page is more than [`PAGE_WINDOW_THRESHOLD`] pages from either
/// end, so it stays put while paging near the edges. No links at all when
/// there is a single page.
pub fn page_links(page: usize, page_count: usize) -> PageLinks {
    if page_count <= 1 {
        return PageLinks::default();
    }

    let page = page.clamp(1, page_count);
    let (start, end) = if page_count <= MAX_VISIBLE_PAGES {
        (1, page_count)
    } else if page <= PAGE_WINDOW_THRESHOLD {
        (1, MAX_VISIBLE_PAGES)
    } else if page > page_count - PAGE_WINDOW_THRESHOLD {
        (page_count - MAX_VISIBLE_PAGES + 1, page_count)
    } else {
        let half = MAX_VISIBLE_PAGES / 2;
        (page - half, page + half)
    };

    PageLinks {
        pages: (start..=end).collect(),
        prev: (page > 1).then(|| page - 1),
        next: (page < page_count).then(|| page + 1),
        first: start > 1,
        leading_ellipsis: start > 2,
        trailing_ellipsis: end + 1 < page_count,
        last: end < page_count,
    }
}
