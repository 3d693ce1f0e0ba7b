//! Fetch tiers: the retrieval strategies the escalation controller sequences
//!
//! # Architecture
//! - `direct` - plain HTTP GET
//! - `impersonate` - browser-fingerprint HTTP client profiles (tiers 2 and 3)
//! - `browser` - disposable headless Chromium rendering
//! - `pool` - bounded worker pool the expensive tiers are handed to

mod browser;
mod direct;
mod impersonate;
mod pool;

pub use browser::{
    BrowserTier, Countermeasure, HideWebdriver, LocaleOverride, UserAgentOverride,
    ViewportOverride, default_countermeasures,
};
pub use direct::DirectTier;
pub use impersonate::{ClientProfile, ImpersonatingTier};
pub use pool::{PoolError, WorkerPool};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::browser::BrowserError;

/// One retrieval strategy in the escalation chain, ordered by cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Direct,
    ImpersonateA,
    ImpersonateB,
    Browser,
}

impl Tier {
    /// Every tier in escalation order
    pub const ALL: [Tier; 4] = [
        Tier::Direct,
        Tier::ImpersonateA,
        Tier::ImpersonateB,
        Tier::Browser,
    ];

    /// The tier tried after this one, `None` after the browser
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Direct => Some(Tier::ImpersonateA),
            Tier::ImpersonateA => Some(Tier::ImpersonateB),
            Tier::ImpersonateB => Some(Tier::Browser),
            Tier::Browser => None,
        }
    }

    /// Whether the tier runs on the worker pool instead of inline
    pub fn is_offloaded(self) -> bool {
        !matches!(self, Tier::Direct)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Direct => "direct",
            Tier::ImpersonateA => "impersonate-a",
            Tier::ImpersonateB => "impersonate-b",
            Tier::Browser => "browser",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure of a single tier
///
/// Always recovered by the controller through escalation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("no fetcher registered for tier {0}")]
    NotConfigured(Tier),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// A retrieval mechanism for one tier
///
/// Implementations create and tear down their own client or browser per call;
/// nothing is shared between invocations.
#[async_trait]
pub trait FetchTier: Send + Sync {
    fn tier(&self) -> Tier;

    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Outcome of invoking one tier
#[derive(Debug)]
pub struct FetchAttempt {
    pub tier: Tier,
    pub result: Result<String, FetchError>,
}

impl FetchAttempt {
    pub fn html(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Send a prepared GET and return the body of a 2xx/3xx response
pub(crate) async fn read_html(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<String, FetchError> {
    let response = request.send().await.map_err(|e| classify(e, timeout))?;

    let status = response.status();
    if !(status.is_success() || status.is_redirection()) {
        return Err(FetchError::Status(status.as_u16()));
    }

    response.text().await.map_err(|e| classify(e, timeout))
}

fn classify(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Http(error)
    }
}
