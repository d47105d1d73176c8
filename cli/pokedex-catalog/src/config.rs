//! Configuration types for catalog client and pipeline construction.

use std::collections::BTreeMap;
use std::num::{NonZeroU32, NonZeroUsize};

use crate::types::PageRequest;

pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_PAGE_LIMIT: NonZeroU32 = NonZeroU32::new(151).unwrap();
/// Detail requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: NonZeroUsize = NonZeroUsize::new(8).unwrap();

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL for the catalog API.
    pub catalog_url: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// User agent sent with every request.
    pub user_agent: Option<String>,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

/// Which page a run fetches and how wide the detail fan-out may get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub page: PageRequest,
    pub max_concurrent_fetches: NonZeroUsize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page: PageRequest::new(0, DEFAULT_PAGE_LIMIT),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}
