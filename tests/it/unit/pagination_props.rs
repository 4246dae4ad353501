//! Property-based tests for page arithmetic.
//!
//! Uses proptest to verify the window invariants hold across random inputs.

use proptest::prelude::*;
use tabledesk::data::pagination::{compute, page_links};

#[test]
fn test_forty_five_rows_by_twenty() {
    let first = compute(45, 20, 1);
    assert_eq!((first.page_count, first.start, first.end), (3, 0, 20));

    let last = compute(45, 20, 3);
    assert_eq!((last.start, last.end), (40, 45));
    assert!(last.has_prev() && !last.has_next());
}

#[test]
fn test_out_of_range_requests_clamp() {
    assert_eq!(compute(45, 20, 1000).page, 3);
    assert_eq!(compute(45, 20, i64::MIN).page, 1);
    assert_eq!(compute(45, 20, i64::MAX).rows(), 40..45);
}

proptest! {
    /// Property: the clamped page is always within [1, max(page_count, 1)]
    #[test]
    fn prop_page_in_range(total in 0usize..10_000, size in 0usize..500, requested in any::<i64>()) {
        let window = compute(total, size, requested);
        prop_assert!(window.page >= 1);
        prop_assert!(window.page <= window.page_count.max(1));
        if total == 0 {
            prop_assert_eq!(window.page_count, 0);
            prop_assert_eq!(window.page, 1);
        }
    }

    /// Property: start <= end <= total and the window never exceeds the page size
    #[test]
    fn prop_window_bounds(total in 0usize..10_000, size in 0usize..500, requested in -5i64..200) {
        let window = compute(total, size, requested);
        prop_assert!(window.start <= window.end);
        prop_assert!(window.end <= total);
        prop_assert!(window.end - window.start <= size.max(1));
        prop_assert_eq!(window.page_count, total.div_ceil(size.max(1)));
    }

    /// Property: identical inputs give identical windows
    #[test]
    fn prop_deterministic(total in 0usize..10_000, size in 0usize..500, requested in any::<i64>()) {
        prop_assert_eq!(compute(total, size, requested), compute(total, size, requested));
    }

    /// Property: walking every page covers each row exactly once
    #[test]
    fn prop_pages_tile_rows(total in 1usize..2_000, size in 1usize..100) {
        let page_count = compute(total, size, 1).page_count;
        let mut next = 0;
        for page in 1..=page_count {
            let window = compute(total, size, page as i64);
            prop_assert_eq!(window.start, next);
            next = window.end;
        }
        prop_assert_eq!(next, total);
    }

    /// Property: the link strip has at most 7 pages, includes the current one, and is contiguous
    #[test]
    fn prop_links_strip(page_count in 2usize..500, page_seed in any::<usize>()) {
        let page = page_seed % page_count + 1;
        let links = page_links(page, page_count);

        prop_assert!(!links.pages.is_empty());
        prop_assert!(links.pages.len() <= 7);
        prop_assert!(links.pages.contains(&page));
        prop_assert!(links.pages.windows(2).all(|w| w[1] == w[0] + 1));
        prop_assert_eq!(links.first, links.pages[0] > 1);
        prop_assert_eq!(links.last, *links.pages.last().unwrap() < page_count);
    }
}
