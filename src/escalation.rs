//! Fetch escalation controller
//!
//! Walks the tiers from cheapest to most expensive as an explicit state
//! machine. After every attempt the quality detector decides whether the
//! result is accepted or the next tier is tried; the walk ends with the first
//! acceptable document or fails once the browser tier has been exhausted.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::Config;
use crate::detector::QualityDetector;
use crate::fetch::{
    BrowserTier, DirectTier, FetchAttempt, FetchError, FetchTier, ImpersonatingTier, Tier,
    WorkerPool,
};

/// Slack added to the browser's own timeouts to cover process launch
const BROWSER_LAUNCH_ALLOWANCE: Duration = Duration::from_secs(30);

/// HTML accepted by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDocument {
    pub url: Url,
    pub html: String,
    pub tier: Tier,
}

/// Why a tier did not produce the accepted document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Timeout, bad status, launch failure and the like
    Transport(String),
    /// Content came back but looked like a challenge or empty shell
    Escalated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierFailure {
    pub tier: Tier,
    pub reason: FailureReason,
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Transport(reason) => write!(f, "{}: {}", self.tier, reason),
            FailureReason::Escalated => write!(f, "{}: challenge or empty page", self.tier),
        }
    }
}

fn describe(attempts: &[TierFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum EscalationError {
    #[error("challenge could not be bypassed ({})", describe(.attempts))]
    ChallengeUnresolved { attempts: Vec<TierFailure> },
}

impl EscalationError {
    pub fn attempts(&self) -> &[TierFailure] {
        match self {
            EscalationError::ChallengeUnresolved { attempts } => attempts,
        }
    }
}

/// Controller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Attempting(Tier),
    Accepted(RawDocument),
    Failed,
}

/// Detector verdict on a successful attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Acceptable,
    Escalate,
}

/// Pure transition function
///
/// `verdict` is only consulted when the attempt produced HTML. Returns the
/// next state and, when the attempt was not accepted, the recorded failure.
pub fn transition(
    url: &Url,
    attempt: FetchAttempt,
    verdict: Verdict,
) -> (State, Option<TierFailure>) {
    let tier = attempt.tier;
    let failure = match attempt.result {
        Ok(html) if verdict == Verdict::Acceptable => {
            let document = RawDocument {
                url: url.clone(),
                html,
                tier,
            };
            return (State::Accepted(document), None);
        }
        Ok(_) => TierFailure {
            tier,
            reason: FailureReason::Escalated,
        },
        Err(e) => TierFailure {
            tier,
            reason: FailureReason::Transport(e.to_string()),
        },
    };

    let next = match tier.next() {
        Some(next) => State::Attempting(next),
        None => State::Failed,
    };
    (next, Some(failure))
}

/// Sequences the fetch tiers for one URL at a time
pub struct EscalationController {
    tiers: HashMap<Tier, Arc<dyn FetchTier>>,
    timeouts: HashMap<Tier, Duration>,
    detector: QualityDetector,
    pool: WorkerPool,
}

impl EscalationController {
    /// Controller with no tiers registered
    pub fn new(detector: QualityDetector, pool: WorkerPool) -> Self {
        Self {
            tiers: HashMap::new(),
            timeouts: HashMap::new(),
            detector,
            pool,
        }
    }

    /// Controller with the four production tiers
    pub fn from_config(config: &Config) -> Self {
        let http_timeout = Duration::from_secs(config.fetch.timeout_secs);
        let browser_timeout = Duration::from_secs(
            config.browser.navigation_timeout_secs + config.browser.network_idle_timeout_secs,
        ) + Duration::from_millis(config.browser.settle_delay_ms)
            + BROWSER_LAUNCH_ALLOWANCE;

        Self::new(
            QualityDetector::new(config.quality.clone()),
            WorkerPool::new(config.fetch.worker_pool_size),
        )
        .with_tier(Arc::new(DirectTier::new(&config.fetch)), http_timeout)
        .with_tier(Arc::new(ImpersonatingTier::tier_a(&config.fetch)), http_timeout)
        .with_tier(Arc::new(ImpersonatingTier::tier_b(&config.fetch)), http_timeout)
        .with_tier(
            Arc::new(BrowserTier::new(&config.browser, &config.fetch)),
            browser_timeout,
        )
    }

    /// Register (or replace) the implementation for `fetcher.tier()`
    pub fn with_tier(mut self, fetcher: Arc<dyn FetchTier>, timeout: Duration) -> Self {
        let tier = fetcher.tier();
        self.tiers.insert(tier, fetcher);
        self.timeouts.insert(tier, timeout);
        self
    }

    pub fn detector(&self) -> &QualityDetector {
        &self.detector
    }

    /// Fetch `url`, escalating until the detector accepts the page
    pub async fn fetch(&self, url: &Url) -> Result<RawDocument, EscalationError> {
        let mut state = State::Attempting(Tier::Direct);
        let mut failures = Vec::new();

        loop {
            match state {
                State::Attempting(tier) => {
                    let attempt = self.attempt(tier, url).await;
                    let verdict = match attempt.html() {
                        Some(html) if !self.detector.needs_escalation(html) => Verdict::Acceptable,
                        _ => Verdict::Escalate,
                    };

                    let (next, failure) = transition(url, attempt, verdict);
                    if let Some(failure) = failure {
                        warn!("Rejected attempt for {} ({})", url, failure);
                        failures.push(failure);
                    }
                    if let State::Attempting(next_tier) = &next {
                        info!("Escalating {} from {} to {}", url, tier, next_tier);
                    }
                    state = next;
                }
                State::Accepted(document) => {
                    info!("Accepted {} from tier {}", url, document.tier);
                    return Ok(document);
                }
                State::Failed => {
                    return Err(EscalationError::ChallengeUnresolved { attempts: failures });
                }
            }
        }
    }

    async fn attempt(&self, tier: Tier, url: &Url) -> FetchAttempt {
        let Some(fetcher) = self.tiers.get(&tier).cloned() else {
            return FetchAttempt {
                tier,
                result: Err(FetchError::NotConfigured(tier)),
            };
        };
        let timeout = self
            .timeouts
            .get(&tier)
            .copied()
            .unwrap_or(Duration::from_secs(30));

        debug!("Trying tier {} for {}", tier, url);
        let bounded = bounded_fetch(fetcher, url.clone(), timeout);
        let result = if tier.is_offloaded() {
            if self.pool.available() == 0 {
                debug!(
                    "All {} workers busy, {} for {} waits for a slot",
                    self.pool.size(),
                    tier,
                    url
                );
            }
            self.pool.run(bounded).await.unwrap_or_else(|e| Err(e.into()))
        } else {
            bounded.await
        };

        FetchAttempt { tier, result }
    }
}

async fn bounded_fetch(
    fetcher: Arc<dyn FetchTier>,
    url: Url,
    timeout: Duration,
) -> Result<String, FetchError> {
    tokio::time::timeout(timeout, fetcher.fetch(&url))
        .await
        .unwrap_or(Err(FetchError::Timeout(timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const CHALLENGE: &str = r#"<html><head><script src="/cdn-cgi/challenge-platform/h/b/orchestrate/jsch/v1"></script></head>
        <body><h1>Just a moment...</h1></body></html>"#;

    #[test]
    fn accepted_document_serializes_its_url() {
        let document = RawDocument {
            url: Url::parse("https://example.com/a?b=c").unwrap(),
            html: "<p>x</p>".to_string(),
            tier: Tier::ImpersonateA,
        };
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            serde_json::json!({
                "url": "https://example.com/a?b=c",
                "html": "<p>x</p>",
                "tier": "impersonate-a"
            })
        );
    }

    fn clean_page() -> String {
        format!(
            "<html><body><main><p>{}</p></main></body></html>",
            "Real article content that a reader came for. ".repeat(10)
        )
    }

    type CallLog = Arc<Mutex<Vec<Tier>>>;

    struct ScriptedTier {
        tier: Tier,
        response: Result<String, u16>,
        calls: CallLog,
    }

    #[async_trait]
    impl FetchTier for ScriptedTier {
        fn tier(&self) -> Tier {
            self.tier
        }

        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(self.tier);
            self.response.clone().map_err(FetchError::Status)
        }
    }

    struct SlowTier;

    #[async_trait]
    impl FetchTier for SlowTier {
        fn tier(&self) -> Tier {
            Tier::Direct
        }

        async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(clean_page())
        }
    }

    fn controller(script: Vec<(Tier, Result<String, u16>)>) -> (EscalationController, CallLog) {
        let calls = CallLog::default();
        let mut controller = EscalationController::new(QualityDetector::default(), WorkerPool::new(2));
        for (tier, response) in script {
            controller = controller.with_tier(
                Arc::new(ScriptedTier {
                    tier,
                    response,
                    calls: calls.clone(),
                }),
                Duration::from_secs(5),
            );
        }
        (controller, calls)
    }

    fn url() -> Url {
        Url::parse("https://example.com/article").unwrap()
    }

    #[tokio::test]
    async fn stops_at_first_clean_tier() {
        let (controller, calls) = controller(vec![
            (Tier::Direct, Ok(CHALLENGE.to_string())),
            (Tier::ImpersonateA, Ok(CHALLENGE.to_string())),
            (Tier::ImpersonateB, Ok(clean_page())),
            (Tier::Browser, Ok(clean_page())),
        ]);

        let document = controller.fetch(&url()).await.unwrap();
        assert_eq!(document.tier, Tier::ImpersonateB);
        assert_eq!(document.url, url());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Tier::Direct, Tier::ImpersonateA, Tier::ImpersonateB]
        );
    }

    #[tokio::test]
    async fn direct_success_skips_every_other_tier() {
        let (controller, calls) = controller(vec![
            (Tier::Direct, Ok(clean_page())),
            (Tier::ImpersonateA, Ok(clean_page())),
        ]);

        let document = controller.fetch(&url()).await.unwrap();
        assert_eq!(document.tier, Tier::Direct);
        assert_eq!(*calls.lock().unwrap(), vec![Tier::Direct]);
    }

    #[tokio::test]
    async fn exhaustion_reports_every_tier_once_in_order() {
        let (controller, calls) = controller(vec![
            (Tier::Direct, Ok(CHALLENGE.to_string())),
            (Tier::ImpersonateA, Err(403)),
            (Tier::ImpersonateB, Ok(String::new())),
            (Tier::Browser, Ok(CHALLENGE.to_string())),
        ]);

        let err = controller.fetch(&url()).await.unwrap_err();
        assert_eq!(*calls.lock().unwrap(), Tier::ALL.to_vec());

        let tiers: Vec<Tier> = err.attempts().iter().map(|f| f.tier).collect();
        assert_eq!(tiers, Tier::ALL.to_vec());
        assert_eq!(
            err.attempts()[1].reason,
            FailureReason::Transport("unexpected HTTP status 403".to_string())
        );
        assert!(err.to_string().starts_with("challenge could not be bypassed"));
    }

    #[tokio::test]
    async fn transport_failure_escalates() {
        let (controller, calls) = controller(vec![
            (Tier::Direct, Err(503)),
            (Tier::ImpersonateA, Ok(clean_page())),
        ]);

        let document = controller.fetch(&url()).await.unwrap();
        assert_eq!(document.tier, Tier::ImpersonateA);
        assert_eq!(*calls.lock().unwrap(), vec![Tier::Direct, Tier::ImpersonateA]);
    }

    #[tokio::test]
    async fn unregistered_tier_counts_as_failure() {
        let (controller, _) = controller(vec![
            (Tier::Direct, Ok(CHALLENGE.to_string())),
            (Tier::ImpersonateB, Ok(clean_page())),
        ]);

        let document = controller.fetch(&url()).await.unwrap();
        assert_eq!(document.tier, Tier::ImpersonateB);
    }

    #[tokio::test]
    async fn controller_timeout_is_transport_failure() {
        let controller = EscalationController::new(QualityDetector::default(), WorkerPool::new(1))
            .with_tier(Arc::new(SlowTier), Duration::from_millis(50));

        let err = controller.fetch(&url()).await.unwrap_err();
        assert!(matches!(
            &err.attempts()[0].reason,
            FailureReason::Transport(reason) if reason.starts_with("request timed out")
        ));
    }

    #[test]
    fn transition_after_browser_fails() {
        let attempt = FetchAttempt {
            tier: Tier::Browser,
            result: Err(FetchError::Status(500)),
        };
        let (state, failure) = transition(&url(), attempt, Verdict::Acceptable);
        assert_eq!(state, State::Failed);
        assert_eq!(failure.map(|f| f.tier), Some(Tier::Browser));
    }

    #[test]
    fn transition_accepts_acceptable_html() {
        let attempt = FetchAttempt {
            tier: Tier::ImpersonateA,
            result: Ok("<p>ok</p>".to_string()),
        };
        let (state, failure) = transition(&url(), attempt, Verdict::Acceptable);
        assert!(failure.is_none());
        assert!(matches!(state, State::Accepted(doc) if doc.tier == Tier::ImpersonateA));
    }

    #[test]
    fn transition_escalates_on_verdict() {
        let attempt = FetchAttempt {
            tier: Tier::Direct,
            result: Ok(CHALLENGE.to_string()),
        };
        let (state, failure) = transition(&url(), attempt, Verdict::Escalate);
        assert_eq!(state, State::Attempting(Tier::ImpersonateA));
        assert_eq!(failure.unwrap().reason, FailureReason::Escalated);
    }
}
