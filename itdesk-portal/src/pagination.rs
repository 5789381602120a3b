//! Page query parameters for list endpoints

use itdesk_common::db::pagination::DEFAULT_PAGE_SIZE;
use serde::Deserialize;

/// `?page=&page_size=`; out-of-range values are clamped by `Page::calculate`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let q: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);

        let q: PageQuery = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(q.page, 3);
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
    }
}
