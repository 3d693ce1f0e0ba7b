//! Tiers 2 and 3: HTTP clients that present a real browser's network fingerprint
//!
//! Each profile fixes the header set and the order headers go on the wire,
//! the HTTP version negotiated, the TLS floor, and whether a cookie jar
//! carries challenge cookies across the redirect chain. The two tiers use
//! different profiles so a block on one fingerprint does not carry over to
//! the other.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{FetchError, FetchTier, Tier, read_html};
use crate::FetchConfig;
use crate::utils::constants::{CHROME_124_SEC_CH_UA, CHROME_124_USER_AGENT, CHROME_USER_AGENT};

/// Wire-level identity of an impersonating client
#[derive(Debug, Clone)]
pub struct ClientProfile {
    pub name: &'static str,
    /// Headers in the exact order the impersonated browser sends them
    pub headers: Vec<(&'static str, String)>,
    /// Restrict to HTTP/1.1 instead of negotiating HTTP/2 through ALPN
    pub http1_only: bool,
    /// Keep a per-request cookie jar across redirects
    pub cookie_jar: bool,
    pub min_tls_version: reqwest::tls::Version,
}

impl ClientProfile {
    /// Desktop Chrome on Windows over HTTP/1.1 with a cookie jar
    pub fn chrome_desktop(accept: &str, accept_language: &str) -> Self {
        Self {
            name: "chrome-desktop-windows",
            headers: vec![
                ("connection", "keep-alive".to_string()),
                ("cache-control", "max-age=0".to_string()),
                ("upgrade-insecure-requests", "1".to_string()),
                ("user-agent", CHROME_USER_AGENT.to_string()),
                ("accept", accept.to_string()),
                ("accept-encoding", "gzip, deflate, br".to_string()),
                ("accept-language", accept_language.to_string()),
            ],
            http1_only: true,
            cookie_jar: true,
            min_tls_version: reqwest::tls::Version::TLS_1_2,
        }
    }

    /// Chrome 124 over HTTP/2 with client hints and fetch metadata
    pub fn chrome_124(accept: &str, accept_language: &str) -> Self {
        Self {
            name: "chrome-124",
            headers: vec![
                ("sec-ch-ua", CHROME_124_SEC_CH_UA.to_string()),
                ("sec-ch-ua-mobile", "?0".to_string()),
                ("sec-ch-ua-platform", "\"Windows\"".to_string()),
                ("upgrade-insecure-requests", "1".to_string()),
                ("user-agent", CHROME_124_USER_AGENT.to_string()),
                ("accept", accept.to_string()),
                ("sec-fetch-site", "none".to_string()),
                ("sec-fetch-mode", "navigate".to_string()),
                ("sec-fetch-user", "?1".to_string()),
                ("sec-fetch-dest", "document".to_string()),
                ("accept-encoding", "gzip, deflate, br".to_string()),
                ("accept-language", accept_language.to_string()),
                ("priority", "u=0, i".to_string()),
            ],
            http1_only: false,
            cookie_jar: false,
            min_tls_version: reqwest::tls::Version::TLS_1_2,
        }
    }

    /// Header map preserving profile order
    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.append(name, value);
                }
                _ => warn!("Skipping invalid header {} in profile {}", name, self.name),
            }
        }
        map
    }
}

/// Browser-impersonating HTTP tier
pub struct ImpersonatingTier {
    tier: Tier,
    profile: ClientProfile,
    timeout: Duration,
}

impl ImpersonatingTier {
    pub fn new(tier: Tier, profile: ClientProfile, timeout: Duration) -> Self {
        Self {
            tier,
            profile,
            timeout,
        }
    }

    /// Tier 2 as configured
    pub fn tier_a(config: &FetchConfig) -> Self {
        Self::new(
            Tier::ImpersonateA,
            ClientProfile::chrome_desktop(&config.accept, &config.accept_language),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Tier 3 as configured
    pub fn tier_b(config: &FetchConfig) -> Self {
        Self::new(
            Tier::ImpersonateB,
            ClientProfile::chrome_124(&config.accept, &config.accept_language),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(self.profile.min_tls_version.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(self.timeout)
            .default_headers(self.profile.header_map())
            .cookie_store(self.profile.cookie_jar)
            .pool_max_idle_per_host(0);

        if self.profile.http1_only {
            builder = builder.http1_only().http1_title_case_headers();
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl FetchTier for ImpersonatingTier {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let client = self.build_client()?;
        debug!("{} GET {} as {}", self.tier, url, self.profile.name);
        read_html(client.get(url.clone()), self.timeout).await
    }
}
