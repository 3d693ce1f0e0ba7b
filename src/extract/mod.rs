//! Content extraction: two competing strategies and the selector between them
//!
//! - `readability` - article extraction, may produce nothing
//! - `structural` - DOM heuristics over the typed tree, always produces output
//! - `select` - per-format choice between the two plus text normalization

mod readability;
mod select;
mod structural;

pub use readability::extract_article;
pub use select::{clean_text, select};
pub use structural::{find_container, structural_markdown, structural_text};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::compose::Format;
use crate::dom::Document;

/// Which extractor produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Readability,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    pub format: Format,
    pub content: String,
    pub strategy: Strategy,
}

impl ExtractionCandidate {
    pub fn new(format: Format, content: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            format,
            content: content.into(),
            strategy,
        }
    }
}

/// A strategy's `text` and `markdown` candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    pub text: ExtractionCandidate,
    pub markdown: ExtractionCandidate,
}

impl CandidateSet {
    pub fn get(&self, format: Format) -> Option<&ExtractionCandidate> {
        match format {
            Format::Text => Some(&self.text),
            Format::Markdown => Some(&self.markdown),
            Format::Html => None,
        }
    }
}

/// Length floors used by the extractors and the selector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionThresholds {
    /// Readability output must be longer than this (trimmed, in characters) to win
    #[serde(default = "default_min_primary_length")]
    pub min_primary_length: usize,

    /// Structural text fragments must be longer than this to be kept
    #[serde(default = "default_min_text_fragment_length")]
    pub min_text_fragment_length: usize,
}

fn default_min_primary_length() -> usize {
    100
}

fn default_min_text_fragment_length() -> usize {
    10
}

impl Default for ExtractionThresholds {
    fn default() -> Self {
        Self {
            min_primary_length: default_min_primary_length(),
            min_text_fragment_length: default_min_text_fragment_length(),
        }
    }
}

/// Selected text and markdown for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub markdown: String,
}

/// Runs both strategies and selects per format
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    thresholds: ExtractionThresholds,
}

impl ContentExtractor {
    pub fn new(thresholds: ExtractionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ExtractionThresholds {
        &self.thresholds
    }

    /// Both strategies over `html`; `document` is its parse
    pub fn extract(&self, html: &str, document: &Document, url: &Url) -> Extraction {
        let article = extract_article(html, url);
        let structural = self.structural(document);

        Extraction {
            text: select(Format::Text, article.as_ref(), &structural, &self.thresholds),
            markdown: select(Format::Markdown, article.as_ref(), &structural, &self.thresholds),
        }
    }

    /// Structural candidates over a noise-stripped copy
    pub fn structural(&self, document: &Document) -> CandidateSet {
        let mut stripped = document.clone();
        stripped.root_mut().strip(structural::NOISE_TAGS);

        CandidateSet {
            text: ExtractionCandidate::new(
                Format::Text,
                structural_text(&stripped, self.thresholds.min_text_fragment_length),
                Strategy::Structural,
            ),
            markdown: ExtractionCandidate::new(
                Format::Markdown,
                structural_markdown(&stripped),
                Strategy::Structural,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/post").unwrap()
    }

    #[test]
    fn short_page_falls_back_to_structural() {
        let html = "<html><head><title>Hi</title></head><body><main><p>Hello world this is content</p></main></body></html>";
        let extraction = ContentExtractor::default().extract(html, &Document::parse(html), &url());
        assert_eq!(extraction.text, "Hello world this is content");
        assert_eq!(extraction.markdown, "Hello world this is content\n");
    }

    #[test]
    fn structural_candidates_ignore_noise() {
        let html = "<body><nav><p>Navigation links here</p></nav><main><p>The actual body copy</p></main><footer><p>Copyright notice text</p></footer></body>";
        let set = ContentExtractor::default().structural(&Document::parse(html));
        assert_eq!(set.text.content, "The actual body copy");
        assert_eq!(set.text.strategy, Strategy::Structural);
        assert_eq!(set.get(Format::Markdown).unwrap().format, Format::Markdown);
        assert!(set.get(Format::Html).is_none());
    }

    #[test]
    fn long_article_uses_readability() {
        let paragraph = "Readable prose about a single subject keeps going for a while. ";
        let html = format!(
            "<html><head><title>Story</title></head><body><div id=\"story\"><p>{0}</p><p>{0}</p><p>{0}</p><p>{0}</p></div></body></html>",
            paragraph.repeat(3)
        );
        let extractor = ContentExtractor::default();
        let document = Document::parse(&html);
        let extraction = extractor.extract(&html, &document, &url());

        let article = extract_article(&html, &url()).unwrap();
        assert!(article.text.content.trim().chars().count() > 100);
        assert_eq!(extraction.text, clean_text(&article.text.content));
    }
}
