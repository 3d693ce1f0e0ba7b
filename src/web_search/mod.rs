//! Web search: one DuckDuckGo query, then a scrape of each result
//!
//! # Architecture
//! - `types` - configuration and result types
//! - `search` - result page retrieval, link extraction and bounded fan-out
//!
//! # Usage
//! ```no_run
//! use std::sync::Arc;
//! use allscrape::{Config, WebScraper, web_search::WebSearch};
//!
//! # async fn run() -> Result<(), allscrape::SearchError> {
//! let config = Config::default();
//! let scraper = Arc::new(WebScraper::from_config(&config));
//! let search = WebSearch::from_config(&config, scraper);
//! let results = search.search("rust programming", None).await?;
//! println!("Scraped {} results", results.results_count());
//! # Ok(())
//! # }
//! ```

mod search;
mod types;

pub use search::{
    RESULT_FORMATS, extract_result_urls, fetch_results_page, resolve_result_href, scrape_all,
    search_url,
};
pub use types::{MAX_RESULTS, SCRAPE_CONCURRENCY, SearchConfig, SearchResults};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::Config;
use crate::pipeline::PageScraper;
use crate::utils::SearchError;

/// Search driver bound to a scraper
pub struct WebSearch {
    config: SearchConfig,
    user_agent: String,
    accept_language: String,
    scraper: Arc<dyn PageScraper>,
}

impl WebSearch {
    pub fn new(
        config: SearchConfig,
        user_agent: impl Into<String>,
        accept_language: impl Into<String>,
        scraper: Arc<dyn PageScraper>,
    ) -> Self {
        Self {
            config,
            user_agent: user_agent.into(),
            accept_language: accept_language.into(),
            scraper,
        }
    }

    pub fn from_config(config: &Config, scraper: Arc<dyn PageScraper>) -> Self {
        Self::new(
            config.search.clone(),
            config.fetch.user_agent.clone(),
            config.fetch.accept_language.clone(),
            scraper,
        )
    }

    /// Search for `query` and scrape up to `max_results` hits
    ///
    /// Only a failure to retrieve the result page is an error; individual
    /// results that cannot be scraped are dropped.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<SearchResults, SearchError> {
        let max_results = max_results.unwrap_or(self.config.max_results);
        info!("Starting web search for query: {}", query);

        let url = search_url(&self.config.endpoint, query)?;
        let page = fetch_results_page(
            &url,
            &self.user_agent,
            &self.accept_language,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;

        let urls = extract_result_urls(&page, max_results);
        info!("Found {} result URLs for query: {}", urls.len(), query);

        let results = scrape_all(self.scraper.clone(), urls, self.config.concurrency).await;
        Ok(SearchResults::new(query.to_string(), results))
    }
}
