//! Result composition: metadata, per-format content and the LLM summary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::dom::Document;
use crate::extract::ContentExtractor;
use crate::page_extractor::{PageMetadata, extract_metadata};

/// Removed before serializing the `html` format
const HTML_NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header"];

/// Output representation of a scraped page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Markdown,
    Html,
    Text,
}

impl Format {
    /// Formats produced when a request names none
    pub const DEFAULT: [Format; 3] = [Format::Markdown, Format::Html, Format::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::Html => "html",
            Format::Text => "text",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" => Ok(Format::Markdown),
            "html" => Ok(Format::Html),
            "text" => Ok(Format::Text),
            other => Err(format!("unknown format '{other}'")),
        }
    }
}

/// Compact view of the page for language-model consumption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSummary {
    pub title: String,
    pub text: String,
    pub word_count: usize,
    pub source_url: String,
}

/// A fully composed scrape result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeDocument {
    pub metadata: PageMetadata,
    /// One entry per requested format
    pub content: BTreeMap<Format, String>,
    pub llm_summary: LlmSummary,
}

impl ScrapeDocument {
    pub fn get(&self, format: Format) -> Option<&str> {
        self.content.get(&format).map(String::as_str)
    }
}

/// Whitespace-separated word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Main content as HTML with scripts, styles and page chrome removed
///
/// Serializes the first `main`, else `article`, else `body`, else the whole
/// document.
pub fn content_html(document: &Document) -> String {
    let mut stripped = document.clone();
    stripped.root_mut().strip(HTML_NOISE_TAGS);

    ["main", "article", "body"]
        .iter()
        .find_map(|tag| stripped.find_tag(tag))
        .map(|el| el.outer_html())
        .unwrap_or_else(|| stripped.to_html())
}

/// Turn accepted HTML into a [`ScrapeDocument`]
///
/// Deterministic: identical input always composes an identical document.
pub fn compose(
    url: &Url,
    html: &str,
    formats: &[Format],
    extractor: &ContentExtractor,
) -> ScrapeDocument {
    let document = Document::parse(html);
    let metadata = extract_metadata(&document, url.as_str());
    let extraction = extractor.extract(html, &document, url);

    let mut content = BTreeMap::new();
    for format in formats {
        let value = match format {
            Format::Text => extraction.text.clone(),
            Format::Markdown => extraction.markdown.clone(),
            Format::Html => content_html(&document),
        };
        content.insert(*format, value);
    }

    let text = content.get(&Format::Text).cloned().unwrap_or_default();
    let llm_summary = LlmSummary {
        title: metadata.title.clone(),
        word_count: word_count(&text),
        text,
        source_url: url.to_string(),
    };

    ScrapeDocument {
        metadata,
        content,
        llm_summary,
    }
}
