//! Escalating web scraper with LLM-ready content extraction
//!
//! Fetches a page through progressively stronger tiers (plain HTTP, two
//! browser-impersonating HTTP clients, headless Chromium) until the content no
//! longer looks like an anti-bot challenge, then turns the HTML into text,
//! markdown, an html fragment and metadata.

mod browser;
pub mod browser_setup;
pub mod compose;
pub mod detector;
pub mod dom;
pub mod escalation;
pub mod extract;
pub mod fetch;
pub mod page_extractor;
pub mod pipeline;
pub mod server;
mod utils;
pub mod web_search;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::utils::constants::{
    CHROME_USER_AGENT, DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_LOCALE,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub quality: QualityThresholds,

    #[serde(default)]
    pub extraction: ExtractionThresholds,

    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// HTTP tier settings shared by the direct and impersonating clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout of the HTTP tiers
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent of the direct tier and the headless browser
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_accept")]
    pub accept: String,

    /// Concurrent impersonation/browser fetches across all requests
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

/// Browser security and launch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Use the browser tier at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Run browser in headless mode
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Disable web security features (Same-Origin Policy, etc.)
    /// WARNING: Only enable for trusted content
    #[serde(default = "default_disable_security")]
    pub disable_security: bool,

    /// Chrome/Chromium binary; discovered or downloaded when unset
    #[serde(default)]
    pub executable: Option<PathBuf>,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Window dimensions
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Upper bound on waiting for the network-idle lifecycle event
    #[serde(default = "default_network_idle_timeout_secs")]
    pub network_idle_timeout_secs: u64,

    /// Extra wait after network idle for late client-side rendering
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_width")]
    pub width: u32,

    #[serde(default = "default_window_height")]
    pub height: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    CHROME_USER_AGENT.to_string()
}
fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}
fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}
fn default_worker_pool_size() -> usize {
    4
}

fn default_enabled() -> bool {
    true
}

fn default_headless() -> bool {
    true
}

fn default_disable_security() -> bool {
    false // SECURE BY DEFAULT
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    45
}

fn default_network_idle_timeout_secs() -> u64 {
    15
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_window_width() -> u32 {
    1365
}

fn default_window_height() -> u32 {
    768
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            accept: default_accept(),
            worker_pool_size: default_worker_pool_size(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            headless: default_headless(),
            disable_security: default_disable_security(),
            executable: None,
            locale: default_locale(),
            window: WindowConfig::default(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            network_idle_timeout_secs: default_network_idle_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
        }
    }
}

/// Load config from `$ALLSCRAPE_CONFIG`, else config.yaml in package root
pub fn load_yaml_config() -> anyhow::Result<Config> {
    let config_path = std::env::var_os("ALLSCRAPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.yaml"));

    if config_path.exists() {
        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub use browser::{BrowserError, BrowserResult, BrowserWrapper};
pub use compose::{Format, LlmSummary, ScrapeDocument};
pub use detector::{QualityDetector, QualityThresholds};
pub use escalation::{EscalationController, EscalationError, RawDocument};
pub use extract::{ContentExtractor, ExtractionThresholds};
pub use fetch::{FetchError, FetchTier, Tier};
pub use page_extractor::PageMetadata;
pub use pipeline::{PageScraper, WebScraper};
pub use server::{AppState, router};
pub use utils::{ScrapeError, SearchError};
pub use web_search::{SearchConfig, SearchResults, WebSearch};

/// Scrape `url` with the configuration from [`load_yaml_config`]
///
/// Builds a fresh scraper per call; long-running callers should keep a
/// [`WebScraper`] instead.
pub async fn scrape_url(url: &str, formats: &[Format]) -> Result<ScrapeDocument, ScrapeError> {
    let config = load_yaml_config().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    WebScraper::from_config(&config).scrape(url, formats).await
}

/// Compose a document from already fetched HTML with default thresholds
///
/// No network access; byte-identical input yields an identical document.
pub fn compose_document(url: &Url, html: &str, formats: &[Format]) -> ScrapeDocument {
    compose::compose(url, html, formats, &ContentExtractor::default())
}

/// Start the HTTP API on `addr`
///
/// Runs until the server stops or fails.
pub async fn start_server(addr: std::net::SocketAddr, config: Config) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    start_server_with_listener(listener, config).await
}

/// Start the HTTP API on a pre-bound listener
pub async fn start_server_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = router(AppState::from_config(&config));

    tracing::info!("allscrape listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
