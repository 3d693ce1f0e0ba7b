//! Browser lifecycle for a single rendering
//!
//! Launches a chromiumoxide browser in a fresh profile and guarantees the
//! process, its CDP handler task, and the profile directory are gone once the
//! wrapper is shut down or dropped.

use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BrowserError, BrowserResult};
use crate::BrowserConfig;
use crate::browser_setup::{ProfileDir, launch_browser};

/// Wrapper for Browser, its event handler task and its profile directory
///
/// Handler MUST be aborted to prevent it running indefinitely after the
/// browser is closed. Field order matters: the profile is dropped last.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: ProfileDir,
    closed: bool,
}

impl BrowserWrapper {
    /// Launch a new isolated browser presenting `user_agent`
    pub async fn launch(config: &BrowserConfig, user_agent: &str) -> BrowserResult<Self> {
        let profile = ProfileDir::create().map_err(|e| BrowserError::IoError(e.to_string()))?;
        debug!("Launching browser with profile {}", profile.path().display());

        let (browser, handler) = launch_browser(config, &profile, user_agent)
            .await
            .map_err(|e| BrowserError::LaunchFailed(format!("{e:#}")))?;

        Ok(Self {
            browser,
            handler,
            profile,
            closed: false,
        })
    }

    /// Get reference to inner browser
    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close Chrome, wait for the process to exit and remove the profile
    ///
    /// The profile is removed only after `wait()` so Chrome has released its
    /// file handles.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
        self.closed = true;
        self.handler.abort();
        info!("Browser shut down, removing {}", self.profile.path().display());
        // ProfileDir removes the directory when self drops here
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        if !self.closed {
            // Browser::drop() kills the Chrome process; fields drop before the profile
            debug!("BrowserWrapper dropped without shutdown, profile will be removed");
        }
    }
}

/// Create a blank page so countermeasures are installed before navigation
pub async fn create_blank_page(wrapper: &BrowserWrapper) -> BrowserResult<Page> {
    let page = wrapper
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;

    debug!("Created blank page for countermeasure injection");
    Ok(page)
}
