//! This module defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of results per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a request may ask for.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

/// The paging query parameters accepted by list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// The 1-based page to return.
    pub page: Option<u64>,
    /// The number of results per page.
    pub page_size: Option<u64>,
}

impl PageQuery {
    /// Resolve the requested page and page size against the configured
    /// defaults and ceiling.
    pub fn resolve(self, config: &PaginationConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(config.default_page).max(1);
        let page_size = self
            .page_size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);

        (page, page_size)
    }
}

/// One page of results plus the bookkeeping a client needs to render
/// pagination controls.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResults<T> {
    /// The results on this page.
    pub results: Vec<T>,
    /// The number of results on this page.
    pub hit_count: u64,
    /// The number of results across all pages.
    pub total_hit_count: u64,
    /// The 1-based page number.
    pub page: u64,
    /// The number of results per page.
    pub page_size: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_prev: bool,
}

impl<T> PagedResults<T> {
    /// Wrap one page of `results` for a query that matched
    /// `total_hit_count` rows overall.
    pub fn new(results: Vec<T>, total_hit_count: u64, page: u64, page_size: u64) -> Self {
        Self {
            hit_count: results.len() as u64,
            results,
            total_hit_count,
            page,
            page_size,
            has_next: page * page_size < total_hit_count,
            has_prev: page > 1,
        }
    }
}

/// The `OFFSET` into a query's rows where `page` starts.
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    (page - 1) * page_size
}
