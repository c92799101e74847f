//! # Paging
//!
//! `Page` turns raw `page` / `rows` request values into a validated window
//! over a result set.
//!
//! ```text
//!   page=3, rows=10
//!   ┌──────────┬──────────┬──────────┬──────────┐
//!   │  1..10   │  11..20  │ ►21..30◄ │  31..40  │
//!   └──────────┴──────────┴──────────┴──────────┘
//!                 offset = (3 - 1) × 10 = 20
//! ```

use crate::error::QueryError;
use serde::{Deserialize, Serialize};

/// Paging limits, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Rows used when the request does not say.
    pub default_rows: u32,
    /// Largest accepted `rows`; larger values are rejected, not clamped.
    pub max_rows: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_rows: 10,
            max_rows: 100,
        }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    number: u32,
    rows_per_page: u32,
}

impl Page {
    /// Parses raw values with the default [`PageLimits`].
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::page::Page;
    ///
    /// let page = Page::parse(Some("1"), Some("10")).unwrap();
    /// assert_eq!((page.number(), page.rows_per_page()), (1, 10));
    ///
    /// assert!(Page::parse(Some("0"), Some("10")).is_err());
    /// assert!(Page::parse(None, Some("1000")).is_err());
    /// ```
    pub fn parse(page: Option<&str>, rows: Option<&str>) -> Result<Page, QueryError> {
        Page::parse_with(PageLimits::default(), page, rows)
    }

    /// Parses raw values against explicit limits.
    ///
    /// Missing or empty `page` means 1; missing or empty `rows` means
    /// `limits.default_rows`.
    pub fn parse_with(
        limits: PageLimits,
        page: Option<&str>,
        rows: Option<&str>,
    ) -> Result<Page, QueryError> {
        let number = match page.map(str::trim).filter(|p| !p.is_empty()) {
            None => 1,
            Some(raw) => {
                let n: i64 = raw
                    .parse()
                    .map_err(|_| QueryError::InvalidPage(raw.to_string()))?;
                if n < 1 || n > u32::MAX as i64 {
                    return Err(QueryError::PageOutOfRange);
                }
                n as u32
            }
        };

        let rows_per_page = match rows.map(str::trim).filter(|r| !r.is_empty()) {
            None => limits.default_rows,
            Some(raw) => {
                let n: i64 = raw
                    .parse()
                    .map_err(|_| QueryError::InvalidRows(raw.to_string()))?;
                if n < 1 || n > limits.max_rows as i64 {
                    return Err(QueryError::RowsOutOfRange {
                        rows: n,
                        max: limits.max_rows,
                    });
                }
                n as u32
            }
        };

        Ok(Page {
            number,
            rows_per_page,
        })
    }

    /// Parses, panicking on failure. Test fixtures only.
    pub fn must_parse(page: &str, rows: &str) -> Page {
        match Page::parse(Some(page), Some(rows)) {
            Ok(p) => p,
            Err(err) => panic!("invalid page {page}/{rows}: {err}"),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn rows_per_page(&self) -> u32 {
        self.rows_per_page
    }

    /// Rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        (self.number as u64 - 1) * self.rows_per_page as u64
    }
}

/// One page of results plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub rows_per_page: u32,
}

impl<T> QueryResult<T> {
    pub fn new(items: Vec<T>, total: usize, page: &Page) -> Self {
        Self {
            items,
            total,
            page: page.number(),
            rows_per_page: page.rows_per_page(),
        }
    }

    /// Converts every item, keeping the paging data.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResult<U> {
        QueryResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            rows_per_page: self.rows_per_page,
        }
    }
}
