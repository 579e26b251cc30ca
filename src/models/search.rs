//! Search result page and connection status models.

use serde::{Deserialize, Serialize};

use crate::models::NormalizedWork;

/// Results per page used by the provider's search endpoint (undocumented default)
pub const PAGE_SIZE: u64 = 20;

/// One page of search results with synthesized pagination metadata.
///
/// Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultPage {
    /// Works found on this page
    pub items: Vec<NormalizedWork>,

    /// Total number of results across all pages
    pub total_results: u64,

    /// The page that was requested (1-based)
    pub current_page: u32,

    /// `ceil(total_results / PAGE_SIZE)`
    pub total_pages: u64,

    /// Whether a later page exists
    pub has_next: bool,

    /// Whether an earlier page exists
    pub has_previous: bool,
}

impl SearchResultPage {
    /// Build a page, deriving pagination from the total and requested page
    pub fn new(items: Vec<NormalizedWork>, total_results: u64, current_page: u32) -> Self {
        let total_pages = total_results.div_ceil(PAGE_SIZE);
        Self {
            items,
            total_results,
            current_page,
            total_pages,
            has_next: u64::from(current_page) < total_pages,
            has_previous: current_page > 1,
        }
    }
}

/// Whether a caller has a usable catalog credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
}
