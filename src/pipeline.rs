//! Fetch-then-extract pipeline for a single URL

use async_trait::async_trait;
use tracing::{info, instrument};
use url::Url;

use crate::Config;
use crate::compose::{Format, ScrapeDocument, compose};
use crate::escalation::EscalationController;
use crate::extract::ContentExtractor;
use crate::utils::ScrapeError;

/// Anything that turns a URL into a [`ScrapeDocument`]
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str, formats: &[Format]) -> Result<ScrapeDocument, ScrapeError>;
}

/// Validate a scrape target: absolute, `http` or `https`, with a host
pub fn parse_target(url: &str) -> Result<Url, ScrapeError> {
    let invalid = |reason: String| ScrapeError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

/// Production scraper: escalating fetch followed by extraction and composition
pub struct WebScraper {
    controller: EscalationController,
    extractor: ContentExtractor,
}

impl WebScraper {
    pub fn new(controller: EscalationController, extractor: ContentExtractor) -> Self {
        Self {
            controller,
            extractor,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EscalationController::from_config(config),
            ContentExtractor::new(config.extraction.clone()),
        )
    }

    pub fn extractor(&self) -> &ContentExtractor {
        &self.extractor
    }
}

#[async_trait]
impl PageScraper for WebScraper {
    #[instrument(skip(self, formats))]
    async fn scrape(&self, url: &str, formats: &[Format]) -> Result<ScrapeDocument, ScrapeError> {
        let target = parse_target(url)?;

        let raw = self
            .controller
            .fetch(&target)
            .await
            .map_err(|source| ScrapeError::Fetch {
                url: url.to_string(),
                source,
            })?;

        info!("Extracting {} ({} bytes from {})", target, raw.html.len(), raw.tier);
        Ok(compose(&target, &raw.html, formats, &self.extractor))
    }
}
