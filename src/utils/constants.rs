//! Shared configuration constants for the fetch tiers
//!
//! Default header values and fingerprint strings used throughout the codebase
//! to ensure consistency and avoid magic strings.

/// Chrome user agent string for the direct tier and the headless browser
///
/// Chrome releases new stable versions ~every 4 weeks.
/// Update quarterly to stay within reasonable version window.
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Chrome 124 user agent used by the HTTP/2 impersonation profile
pub const CHROME_124_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Client hints matching [`CHROME_124_USER_AGENT`]
pub const CHROME_124_SEC_CH_UA: &str =
    "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"";

/// Default `Accept` header for document requests
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Default `Accept-Language` header and browser locale preference
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7";

/// Default browser locale
pub const DEFAULT_LOCALE: &str = "tr-TR";

/// Init script hiding the automation flag from page scripts
pub const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";
