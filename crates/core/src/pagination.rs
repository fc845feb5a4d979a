//! Page-number pagination for post feeds.
//!
//! Page numbers are 1-based and always land on an existing page: a missing or
//! unparsable number selects the first page, anything past the end selects
//! the last one. An empty feed still has a single, empty page.

use serde::Serialize;

/// Splits a counted result set into fixed-size pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

/// The slice of a result set selected for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages, at least 1.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    /// Rows to skip.
    pub offset: u64,
    /// Rows to take.
    pub limit: u64,
}

impl Paginator {
    /// Create a paginator. A page size of zero is treated as one.
    #[must_use]
    pub const fn new(per_page: u64) -> Self {
        Self {
            per_page: if per_page == 0 { 1 } else { per_page },
        }
    }

    /// Items per page.
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Number of pages needed for `count` items.
    #[must_use]
    pub const fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Resolve a raw `page` query value against `count` items.
    #[must_use]
    pub fn window(&self, count: u64, raw_page: Option<&str>) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match raw_page.and_then(|raw| raw.trim().parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 => 1,
            Some(n) => u64::try_from(n).unwrap_or(1).min(num_pages),
        };

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// One page of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    /// Build a page from the items fetched for `window`.
    #[must_use]
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirteen_items_split_ten_and_three() {
        let paginator = Paginator::new(10);

        let first = paginator.window(13, None);
        assert_eq!(first.number, 1);
        assert_eq!(first.num_pages, 2);
        assert_eq!((first.offset, first.limit), (0, 10));

        let second = paginator.window(13, Some("2"));
        assert_eq!(second.number, 2);
        assert_eq!((second.offset, second.limit), (10, 10));
    }

    #[test]
    fn test_out_of_range_pages_clamp() {
        let paginator = Paginator::new(10);

        assert_eq!(paginator.window(13, Some("99")).number, 2);
        assert_eq!(paginator.window(13, Some("0")).number, 1);
        assert_eq!(paginator.window(13, Some("-4")).number, 1);
        assert_eq!(paginator.window(13, Some("abc")).number, 1);
        assert_eq!(paginator.window(13, Some("")).number, 1);
    }

    #[test]
    fn test_empty_feed_has_one_page() {
        let paginator = Paginator::new(10);
        let window = paginator.window(0, Some("3"));

        assert_eq!(window.number, 1);
        assert_eq!(window.num_pages, 1);
        assert_eq!(window.offset, 0);

        let page: Page<u8> = Page::new(vec![], window);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn test_page_links() {
        let paginator = Paginator::new(10);
        let page = Page::new(vec![1, 2, 3], paginator.window(23, Some("2")));

        assert!(page.has_next);
        assert!(page.has_previous);
        assert_eq!(page.next_page_number, Some(3));
        assert_eq!(page.previous_page_number, Some(1));
    }

    #[test]
    fn test_zero_page_size_is_one() {
        assert_eq!(Paginator::new(0).per_page(), 1);
    }
}
