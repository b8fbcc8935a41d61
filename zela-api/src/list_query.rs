//! Pagination support for list endpoints.
//!
//! Every list endpoint accepts `page` / `per_page` query parameters and
//! wraps its items in a [`Page`] envelope carrying the total row count,
//! so the frontend can render pagers without a second request.

use rocket::form::FromForm;
use serde::Serialize;
use ts_rs::TS;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Pagination query options, collected with a trailing `<query..>` segment.
#[derive(FromForm, Debug, Clone, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// 1-based page number; out-of-range input clamps to the first page.
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PER_PAGE)
            .min(MAX_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.per_page()
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

/// One page of results plus the paging envelope.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        Page {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }

    /// Maps the item type while keeping the envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = <PageQuery as Default>::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_offset_and_clamping() {
        let q = PageQuery {
            page: Some(3),
            per_page: Some(50),
        };
        assert_eq!(q.offset(), 100);

        let q = PageQuery {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), MAX_PER_PAGE);
    }
}
