//! Content-quality and anti-bot challenge detection
//!
//! Decides whether a fetched page is real content or whether the escalation
//! controller should move on to a stronger fetch tier.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::Document;

/// Markers left in the markup by challenge platforms (matched lower-cased)
pub const CHALLENGE_MARKERS: &[&str] = &[
    "cdn-cgi/challenge-platform",
    "__cf$cv$params",
    "cf_chl_",
    "cf-browser-verification",
    "cf-chl-bypass",
];

/// Phrases shown on interstitial pages (matched against lower-cased visible text)
pub const CHALLENGE_PHRASES: &[&str] = &[
    "just a moment",
    "checking your browser",
    "managed challenge",
];

/// Tunable thresholds for [`QualityDetector`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityThresholds {
    /// Tag of the client-side rendering mount point
    #[serde(default = "default_app_mount_tag")]
    pub app_mount_tag: String,

    /// `id` attribute of the mount point
    #[serde(default = "default_app_mount_id")]
    pub app_mount_id: String,

    /// Mount point text shorter than this means an unrendered shell
    #[serde(default = "default_min_app_mount_text")]
    pub min_app_mount_text: usize,

    /// With challenge markers present, page text shorter than this is still a challenge
    #[serde(default = "default_min_challenge_page_text")]
    pub min_challenge_page_text: usize,
}

fn default_app_mount_tag() -> String {
    "div".to_string()
}

fn default_app_mount_id() -> String {
    "root".to_string()
}

fn default_min_app_mount_text() -> usize {
    50
}

fn default_min_challenge_page_text() -> usize {
    200
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            app_mount_tag: default_app_mount_tag(),
            app_mount_id: default_app_mount_id(),
            min_app_mount_text: default_min_app_mount_text(),
            min_challenge_page_text: default_min_challenge_page_text(),
        }
    }
}

/// Pure judge of fetched HTML
#[derive(Debug, Clone, Default)]
pub struct QualityDetector {
    thresholds: QualityThresholds,
}

impl QualityDetector {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Returns `true` when the page is a challenge or an empty shell and a
    /// stronger tier should be tried.
    pub fn needs_escalation(&self, html: &str) -> bool {
        if html.is_empty() {
            debug!("Empty response body, escalating");
            return true;
        }

        let document = Document::parse(html);

        if self.has_empty_app_mount(&document) {
            debug!("App mount element is an empty shell, escalating");
            return true;
        }

        let lower_html = html.to_lowercase();
        if !CHALLENGE_MARKERS
            .iter()
            .any(|marker| lower_html.contains(marker))
        {
            return false;
        }

        let text = document.text();
        let lower_text = text.to_lowercase();
        if let Some(phrase) = CHALLENGE_PHRASES
            .iter()
            .find(|phrase| lower_text.contains(*phrase))
        {
            debug!("Challenge phrase {:?} found, escalating", phrase);
            return true;
        }

        let text_len = text.chars().count();
        let escalate = text_len < self.thresholds.min_challenge_page_text;
        debug!(
            "Challenge markers present with {} chars of text, escalate={}",
            text_len, escalate
        );
        escalate
    }

    fn has_empty_app_mount(&self, document: &Document) -> bool {
        let mount = document.find(|el| {
            el.tag() == self.thresholds.app_mount_tag
                && el.attr("id") == Some(self.thresholds.app_mount_id.as_str())
        });

        match mount {
            Some(mount) => mount.text().chars().count() < self.thresholds.min_app_mount_text,
            None => false,
        }
    }
}
