//! Tier 1: plain HTTP GET

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{FetchError, FetchTier, Tier, read_html};
use crate::FetchConfig;

/// Standard HTTP client with redirect following and a fixed timeout
pub struct DirectTier {
    timeout: Duration,
    user_agent: String,
    accept: String,
    accept_language: String,
}

impl DirectTier {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: config.user_agent.clone(),
            accept: config.accept.clone(),
            accept_language: config.accept_language.clone(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (USER_AGENT, &self.user_agent),
            (ACCEPT_LANGUAGE, &self.accept_language),
            (ACCEPT, &self.accept),
        ] {
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }
        headers
    }
}

#[async_trait]
impl FetchTier for DirectTier {
    fn tier(&self) -> Tier {
        Tier::Direct
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        // Fresh client per call: no connection pool or cookies leak across requests
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(self.timeout)
            .default_headers(self.headers())
            .build()?;

        debug!("Direct GET {}", url);
        read_html(client.get(url.clone()), self.timeout).await
    }
}
