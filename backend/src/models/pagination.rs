//! LIMIT/OFFSET pagination shared by every listing.

use serde::Serialize;

/// Default page size for listings that do not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Upper bound applied to client supplied page sizes.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page number accepted; keeps `offset` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// A validated page selector. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a page request from optional query values.
    ///
    /// Missing or non-positive values fall back to page 1 and
    /// `default_size`; the size is capped at [`MAX_PAGE_SIZE`] and the page
    /// at [`MAX_PAGE`].
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1).min(MAX_PAGE);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .unwrap_or(default_size)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// A fixed page that is not subject to the client cap.
    pub fn fixed(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.page_size.max(0))
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Slice an already filtered and ordered collection.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset().max(0) as usize)
            .take(self.limit().max(0) as usize)
            .cloned()
            .collect()
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Number of pages needed for `total` rows (`ceil(total / page_size)`).
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None, DEFAULT_PAGE_SIZE);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 10);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_request_rejects_non_positive_values() {
        let req = PageRequest::new(Some(0), Some(-5), 20);
        assert_eq!(req, PageRequest::fixed(1, 20));
    }

    #[test]
    fn test_page_size_is_capped() {
        let req = PageRequest::new(Some(3), Some(1000), DEFAULT_PAGE_SIZE);
        assert_eq!(req.page_size, MAX_PAGE_SIZE);
        assert_eq!(req.offset(), 200);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let req = PageRequest::new(Some(i64::MAX), Some(100), DEFAULT_PAGE_SIZE);
        assert_eq!(req.page, MAX_PAGE);
        assert!(req.offset() > 0);
        assert!(req.apply(&[1, 2, 3]).is_empty());

        assert_eq!(PageRequest::fixed(i64::MAX, i64::MAX).offset(), i64::MAX);
    }

    #[test]
    fn test_apply_slices_items() {
        let items: Vec<i32> = (1..=25).collect();
        let page = PageRequest::fixed(3, 10).apply(&items);
        assert_eq!(page, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }
}
