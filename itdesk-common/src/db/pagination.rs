//! Pagination for list endpoints

use serde::Serialize;

/// Default rows per page
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl Page {
    /// Sanitize the requested page against the result count
    ///
    /// Page is clamped to [1, total_pages]; page size to [1, MAX_PAGE_SIZE].
    pub fn calculate(total_items: i64, requested_page: i64, requested_size: i64) -> Self {
        let page_size = requested_size.clamp(1, MAX_PAGE_SIZE);
        let total_items = total_items.max(0);
        let total_pages = (total_items + page_size - 1) / page_size;
        let page = requested_page.max(1).min(total_pages.max(1));

        Self {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }

    /// Offset for SQL LIMIT/OFFSET
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

/// A page of rows plus its metadata
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub page: Page,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = Page::calculate(50, 2, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = Page::calculate(30, 99, 20);
        assert_eq!(p.page, 2);
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = Page::calculate(30, -4, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = Page::calculate(0, 1, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(Page::calculate(500, 1, 0).page_size, 1);
        assert_eq!(Page::calculate(500, 1, 10_000).page_size, MAX_PAGE_SIZE);
    }
}
