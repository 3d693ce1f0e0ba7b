use thiserror::Error;

use crate::escalation::EscalationError;

/// Failure to scrape a single URL
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to scrape {url}: invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to scrape {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: EscalationError,
    },
}

impl ScrapeError {
    pub fn url(&self) -> &str {
        match self {
            ScrapeError::InvalidUrl { url, .. } | ScrapeError::Fetch { url, .. } => url,
        }
    }

    /// The request itself was unusable, as opposed to the fetch failing
    pub fn is_invalid_url(&self) -> bool {
        matches!(self, ScrapeError::InvalidUrl { .. })
    }
}

/// Failure of the search listing step
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search failed: invalid search endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Search failed: {0}")]
    Request(String),

    #[error("Search failed: HTTP status {0}")]
    Status(u16),
}

/// Implement From<reqwest::Error> for SearchError
impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

impl From<url::ParseError> for SearchError {
    fn from(err: url::ParseError) -> Self {
        SearchError::InvalidEndpoint(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::{FailureReason, TierFailure};
    use crate::fetch::Tier;

    #[test]
    fn scrape_error_names_the_url() {
        let err = ScrapeError::Fetch {
            url: "https://blocked.example/".to_string(),
            source: EscalationError::ChallengeUnresolved {
                attempts: vec![TierFailure {
                    tier: Tier::Browser,
                    reason: FailureReason::Escalated,
                }],
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to scrape https://blocked.example/: challenge could not be bypassed (browser: challenge or empty page)"
        );
        assert!(!err.is_invalid_url());
        assert_eq!(err.url(), "https://blocked.example/");
    }

    #[test]
    fn search_error_message() {
        assert_eq!(SearchError::Status(503).to_string(), "Search failed: HTTP status 503");
    }
}
