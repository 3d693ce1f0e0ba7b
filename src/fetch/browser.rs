//! Tier 4: full headless rendering in a disposable Chromium
//!
//! A fresh browser with its own profile is launched for every call. The page
//! is prepared by the configured countermeasures while still blank, navigated,
//! given time for network activity to settle, and its rendered DOM captured.
//! The browser is shut down whatever the outcome.

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventLifecycleEvent, GetFrameTreeParams,
    SetLifecycleEventsEnabledParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{FetchError, FetchTier, Tier};
use crate::browser::{BrowserError, BrowserResult, BrowserWrapper, create_blank_page};
use crate::utils::constants::HIDE_WEBDRIVER_SCRIPT;
use crate::{BrowserConfig, FetchConfig};

/// Page preparation applied before navigation
///
/// A failing countermeasure is logged and skipped; the render continues.
#[async_trait]
pub trait Countermeasure: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, page: &Page) -> BrowserResult<()>;
}

fn countermeasure_error(name: &'static str, err: impl std::fmt::Display) -> BrowserError {
    BrowserError::Countermeasure {
        name,
        reason: err.to_string(),
    }
}

/// Hide `navigator.webdriver` from every document the page loads
pub struct HideWebdriver;

#[async_trait]
impl Countermeasure for HideWebdriver {
    fn name(&self) -> &'static str {
        "hide-webdriver"
    }

    async fn apply(&self, page: &Page) -> BrowserResult<()> {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            HIDE_WEBDRIVER_SCRIPT,
        ))
        .await
        .map_err(|e| countermeasure_error(self.name(), e))?;
        Ok(())
    }
}

/// Emulated locale for `Intl` and `navigator.language`
pub struct LocaleOverride {
    pub locale: String,
}

#[async_trait]
impl Countermeasure for LocaleOverride {
    fn name(&self) -> &'static str {
        "locale"
    }

    async fn apply(&self, page: &Page) -> BrowserResult<()> {
        page.execute(SetLocaleOverrideParams {
            locale: Some(self.locale.clone()),
        })
        .await
        .map_err(|e| countermeasure_error(self.name(), e))?;
        Ok(())
    }
}

/// Desktop-sized viewport instead of the headless default
pub struct ViewportOverride {
    pub width: u32,
    pub height: u32,
}

#[async_trait]
impl Countermeasure for ViewportOverride {
    fn name(&self) -> &'static str {
        "viewport"
    }

    async fn apply(&self, page: &Page) -> BrowserResult<()> {
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(self.width),
            i64::from(self.height),
            1.0,
            false,
        ))
        .await
        .map_err(|e| countermeasure_error(self.name(), e))?;
        Ok(())
    }
}

/// User agent and `Accept-Language` sent by the page
pub struct UserAgentOverride {
    pub user_agent: String,
    pub accept_language: String,
}

#[async_trait]
impl Countermeasure for UserAgentOverride {
    fn name(&self) -> &'static str {
        "user-agent"
    }

    async fn apply(&self, page: &Page) -> BrowserResult<()> {
        let mut params = SetUserAgentOverrideParams::new(self.user_agent.clone());
        params.accept_language = Some(self.accept_language.clone());
        page.execute(params)
            .await
            .map_err(|e| countermeasure_error(self.name(), e))?;
        Ok(())
    }
}

/// The stock countermeasure set, in application order
pub fn default_countermeasures(
    browser: &BrowserConfig,
    fetch: &FetchConfig,
) -> Vec<Arc<dyn Countermeasure>> {
    vec![
        Arc::new(HideWebdriver),
        Arc::new(LocaleOverride {
            locale: browser.locale.clone(),
        }),
        Arc::new(ViewportOverride {
            width: browser.window.width,
            height: browser.window.height,
        }),
        Arc::new(UserAgentOverride {
            user_agent: fetch.user_agent.clone(),
            accept_language: fetch.accept_language.clone(),
        }),
    ]
}

/// Main frame and document loader of the committed navigation
///
/// Lifecycle events from the blank page that preceded it carry another
/// loader id and are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NavigationTarget {
    frame_id: String,
    loader_id: String,
}

impl NavigationTarget {
    async fn current(page: &Page) -> BrowserResult<Self> {
        let tree = page.execute(GetFrameTreeParams::default()).await?;
        let frame = &tree.result.frame_tree.frame;
        Ok(Self {
            frame_id: frame.id.inner().clone(),
            loader_id: frame.loader_id.inner().clone(),
        })
    }

    fn is_idle(&self, event: &EventLifecycleEvent) -> bool {
        self.matches_idle(&event.name, event.frame_id.inner(), event.loader_id.inner())
    }

    fn matches_idle(&self, name: &str, frame_id: &str, loader_id: &str) -> bool {
        name == "networkIdle" && frame_id == self.frame_id && loader_id == self.loader_id
    }
}

/// Headless rendering tier
pub struct BrowserTier {
    config: BrowserConfig,
    user_agent: String,
    countermeasures: Vec<Arc<dyn Countermeasure>>,
}

impl BrowserTier {
    pub fn new(browser: &BrowserConfig, fetch: &FetchConfig) -> Self {
        Self {
            config: browser.clone(),
            user_agent: fetch.user_agent.clone(),
            countermeasures: default_countermeasures(browser, fetch),
        }
    }

    /// Replace the countermeasure set
    pub fn with_countermeasures(mut self, countermeasures: Vec<Arc<dyn Countermeasure>>) -> Self {
        self.countermeasures = countermeasures;
        self
    }

    pub fn countermeasures(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.countermeasures.iter().map(|c| c.name())
    }

    async fn render(&self, wrapper: &BrowserWrapper, url: &Url) -> BrowserResult<String> {
        let page = create_blank_page(wrapper).await?;

        for countermeasure in &self.countermeasures {
            if let Err(e) = countermeasure.apply(&page).await {
                warn!("Skipping countermeasure: {}", e);
            }
        }

        page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
        let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

        let navigation_timeout = Duration::from_secs(self.config.navigation_timeout_secs);
        tokio::time::timeout(navigation_timeout, page.goto(url.as_str()))
            .await
            .map_err(|_| {
                BrowserError::NavigationFailed(format!(
                    "timeout after {}s for {}",
                    navigation_timeout.as_secs(),
                    url
                ))
            })??;

        let target = NavigationTarget::current(&page).await?;
        let idle_timeout = Duration::from_secs(self.config.network_idle_timeout_secs);
        let idle = tokio::time::timeout(idle_timeout, async {
            while let Some(event) = lifecycle.next().await {
                if target.is_idle(&event) {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        if !idle {
            debug!("No network idle within {}s for {}, continuing", idle_timeout.as_secs(), url);
        }

        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        page.content()
            .await
            .map_err(|e| BrowserError::ContentFailed(e.to_string()))
    }
}

#[async_trait]
impl FetchTier for BrowserTier {
    fn tier(&self) -> Tier {
        Tier::Browser
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if !self.config.enabled {
            return Err(BrowserError::Disabled.into());
        }

        let wrapper = BrowserWrapper::launch(&self.config, &self.user_agent).await?;
        info!("Rendering {} in headless browser", url);

        let result = self.render(&wrapper, url).await;
        wrapper.shutdown().await;

        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_navigation_loader_counts_as_idle() {
        let target = NavigationTarget {
            frame_id: "MAIN".to_string(),
            loader_id: "NAV".to_string(),
        };
        assert!(target.matches_idle("networkIdle", "MAIN", "NAV"));
        assert!(!target.matches_idle("networkIdle", "MAIN", "BLANK"));
        assert!(!target.matches_idle("networkIdle", "CHILD", "NAV"));
        assert!(!target.matches_idle("networkAlmostIdle", "MAIN", "NAV"));
        assert!(!target.matches_idle("load", "MAIN", "NAV"));
    }

    #[test]
    fn default_set_in_application_order() {
        let tier = BrowserTier::new(&BrowserConfig::default(), &FetchConfig::default());
        let names: Vec<_> = tier.countermeasures().collect();
        assert_eq!(names, ["hide-webdriver", "locale", "viewport", "user-agent"]);
    }

    #[test]
    fn countermeasures_follow_config() {
        let browser = BrowserConfig {
            locale: "de-DE".to_string(),
            ..BrowserConfig::default()
        };
        let set = default_countermeasures(&browser, &FetchConfig::default());
        assert_eq!(set.len(), 4);
        assert_eq!(set[1].name(), "locale");
    }

    #[test]
    fn countermeasures_can_be_replaced() {
        let tier = BrowserTier::new(&BrowserConfig::default(), &FetchConfig::default())
            .with_countermeasures(vec![Arc::new(HideWebdriver)]);
        assert_eq!(tier.countermeasures().collect::<Vec<_>>(), ["hide-webdriver"]);
    }

    #[tokio::test]
    async fn disabled_tier_fails_without_launching() {
        let browser = BrowserConfig {
            enabled: false,
            ..BrowserConfig::default()
        };
        let tier = BrowserTier::new(&browser, &FetchConfig::default());
        let url = Url::parse("https://example.com").unwrap();
        let err = tier.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Browser(BrowserError::Disabled)));
    }
}
