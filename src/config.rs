//! Configuration for query construction.

use serde::{Deserialize, Serialize};

/// Page size applied when a request does not carry a usable `page_size`.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Configuration for search query construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Page size substituted for missing or invalid `page_size` parameters.
    pub default_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
