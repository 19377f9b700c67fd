//! Page-number pagination helpers shared by page and version listings.

use serde::Serialize;

/// Default number of items per page.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum number of items a caller may request per page.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided 1-based page number.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Row offset for a 1-based page number.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page.max(1) - 1) * limit
}

/// One page of results plus the counters a paging UI needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub docs: Vec<T>,
    pub total_docs: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T> Paginated<T> {
    /// Wrap an already-sliced page of `docs` out of `total_docs` matches.
    pub fn new(docs: Vec<T>, total_docs: i64, page: i64, limit: i64) -> Self {
        let total_pages = if total_docs == 0 {
            0
        } else {
            (total_docs + limit - 1) / limit
        };
        Self {
            docs,
            total_docs,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Slice a full in-memory result set down to the requested page.
    pub fn from_all(all: Vec<T>, page: i64, limit: i64) -> Self {
        let total = all.len() as i64;
        let offset = page_offset(page, limit) as usize;
        let docs = all
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();
        Self::new(docs, total, page, limit)
    }

    /// Transform every item while keeping the counters.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            docs: self.docs.into_iter().map(f).collect(),
            total_docs: self.total_docs,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
