//! Pagination utilities for service layer
//!
//! Provides a simple `Pagination` struct, input normalization and the `Page`
//! envelope returned by paginated reads.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    pub page: u64,
    /// items per page
    pub per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self { page, per_page }
    }

    /// Clamp to `page >= 1` and `per_page >= 1`. Large pages are honored.
    pub fn clamped(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.max(1),
        }
    }

    /// Clamp and convert to a 0-based page index plus page size
    pub fn normalize(self) -> (u64, u64) {
        let p = self.clamped();
        (p.page - 1, p.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 10 } }
}

/// One page of results with navigation flags.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub results: Vec<T>,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    pub fn new(opts: Pagination, total: u64, results: Vec<T>) -> Self {
        let Pagination { page, per_page } = opts.clamped();
        Self {
            total,
            page,
            per_page,
            results,
            has_next: page.saturating_mul(per_page) < total,
            has_prev: page > 1,
        }
    }
}
