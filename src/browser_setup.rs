use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::BrowserConfig;

/// Disposable Chrome profile directory
///
/// Created per launch and removed when dropped, so every exit path of the
/// browser tier (success, error, timeout cancellation) leaves no profile behind.
#[derive(Debug)]
pub struct ProfileDir {
    path: PathBuf,
    keep: bool,
}

impl ProfileDir {
    /// Create a uniquely named profile directory under the system temp dir
    pub fn create() -> Result<Self> {
        let path = std::env::temp_dir().join(format!(
            "allscrape_chrome_{}_{}",
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ));
        Self::at(path)
    }

    pub fn at(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path).with_context(|| {
            format!("Failed to create user data directory {}", path.display())
        })?;
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the directory on disk after drop (for inspecting Chrome crashes)
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        if self.keep || !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed browser profile {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove browser profile {}: {}. Manual cleanup may be required.",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(target_os = "windows")]
const CANDIDATE_PATHS: &[&str] = &[
    r"%PROGRAMFILES%\Google\Chrome\Application\chrome.exe",
    r"%PROGRAMFILES(X86)%\Google\Chrome\Application\chrome.exe",
    r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const CANDIDATE_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "~/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const CANDIDATE_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Find a Chrome/Chromium executable
///
/// Resolution order: explicit `configured` path, `CHROMIUM_PATH`, well-known
/// install locations, then `which` on Unix.
pub async fn find_browser_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        warn!("Configured browser executable does not exist: {}", path.display());
    }

    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!("CHROMIUM_PATH points to non-existent file: {}", path.display());
    }

    for candidate in CANDIDATE_PATHS {
        let Some(path) = resolve_candidate(candidate) else {
            continue;
        };
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in ["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which {}': {}", cmd, found);
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    warn!("No Chrome/Chromium executable found");
    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

fn resolve_candidate(candidate: &str) -> Option<PathBuf> {
    if let Some(rest) = candidate.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if candidate.contains('%') {
        return Some(PathBuf::from(expand_windows_env_vars(candidate)));
    }
    Some(PathBuf::from(candidate))
}

/// Expand `%VAR%` tokens, keeping unknown variables verbatim and `%%` as `%`
fn expand_windows_env_vars(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(0) => {
                result.push('%');
                rest = &after[1..];
            }
            Some(end) => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        result.push('%');
                        result.push_str(name);
                        result.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// Download a managed Chromium into the user cache when none is installed
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("Downloading managed Chromium browser...");

    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir().join(".cache");
            warn!(
                "Could not determine system cache directory, using {}",
                fallback.display()
            );
            fallback
        })
        .join("allscrape/chromium");

    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );

    let revision_info = fetcher.fetch().await.context("Failed to fetch browser")?;
    info!(
        "Downloaded Chromium to: {}",
        revision_info.folder_path.display()
    );

    Ok(revision_info.executable_path)
}

/// Launch a headless Chromium configured for scraping
///
/// # Arguments
/// * `config` - Browser section of the scraper configuration
/// * `profile` - Profile directory for this instance only
/// * `user_agent` - User agent presented by every page of this instance
///
/// # Handler Lifecycle
/// The returned `JoinHandle` drives the CDP connection and MUST be aborted once
/// the browser is closed. `BrowserWrapper` does this on drop.
pub async fn launch_browser(
    config: &BrowserConfig,
    profile: &ProfileDir,
    user_agent: &str,
) -> Result<(Browser, JoinHandle<()>)> {
    let chrome_path = match find_browser_executable(config.executable.as_deref()).await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(config.navigation_timeout_secs))
        .window_size(config.window.width, config.window.height)
        .user_data_dir(profile.path())
        .chrome_executable(chrome_path);

    builder = if config.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    for arg in launch_args(config, user_agent) {
        builder = builder.arg(arg);
    }

    let browser_config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    debug!("Launching browser with config: {:?}", browser_config);
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();

            // Chrome emits CDP events chromiumoxide cannot deserialize
            // Reference: https://github.com/mattsse/chromiumoxide/issues/167
            if message.contains("data did not match any variant of untagged enum Message")
                || message.contains("Failed to deserialize WS response")
            {
                trace!("Suppressed benign CDP serialization error: {}", message);
            } else {
                error!("Browser handler error: {:?}", e);
            }
        }
        debug!("Browser handler task completed");
    });

    Ok((browser, handler_task))
}

/// Command-line switches for a scraping instance
fn launch_args(config: &BrowserConfig, user_agent: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        format!("--user-agent={}", user_agent),
        format!("--lang={}", config.locale),
    ];

    args.extend(
        [
            "--disable-blink-features=AutomationControlled",
            "--disable-dev-shm-usage",
            "--disable-infobars",
            "--disable-notifications",
            "--disable-print-preview",
            "--disable-software-rasterizer",
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-breakpad",
            "--disable-component-extensions-with-background-pages",
            "--disable-features=TranslateUI",
            "--disable-hang-monitor",
            "--disable-ipc-flooding-protection",
            "--disable-prompt-on-repost",
            "--metrics-recording-only",
            "--password-store=basic",
            "--use-mock-keychain",
            "--hide-scrollbars",
            "--mute-audio",
        ]
        .map(String::from),
    );

    if config.disable_security {
        info!("WARNING: Disabling browser security features (disable_security=true)");
        args.push("--disable-web-security".to_string());
        args.push("--disable-features=IsolateOrigins,site-per-process".to_string());
        args.push("--ignore-certificate-errors".to_string());
    }

    // setuid sandboxing does not work inside containers
    if should_disable_sandbox() || config.disable_security {
        args.push("--no-sandbox".to_string());
        args.push("--disable-setuid-sandbox".to_string());
    }

    args
}

/// Detect if running in containerized environment (Docker, etc.)
fn should_disable_sandbox() -> bool {
    Path::new("/.dockerenv").exists()
        || std::env::var("container").is_ok()
        || std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
}
