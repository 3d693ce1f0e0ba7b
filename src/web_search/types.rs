//! Search configuration and result types

use serde::{Deserialize, Serialize};

use crate::compose::ScrapeDocument;

/// Candidate URLs taken from the result page by default
pub const MAX_RESULTS: usize = 5;

/// Result pages scraped at the same time
pub const SCRAPE_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// DuckDuckGo HTML endpoint; the query is appended as `?q=`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_max_results() -> usize {
    MAX_RESULTS
}

fn default_concurrency() -> usize {
    SCRAPE_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_results: default_max_results(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scraped documents for one query, in search ranking order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<ScrapeDocument>,
}

impl SearchResults {
    pub fn new(query: String, results: Vec<ScrapeDocument>) -> Self {
        Self { query, results }
    }

    pub fn results_count(&self) -> usize {
        self.results.len()
    }
}
