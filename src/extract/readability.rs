//! Readability article extraction

use std::io::Cursor;
use tracing::debug;
use url::Url;

use super::{CandidateSet, ExtractionCandidate, Strategy};
use crate::compose::Format;
use crate::dom::Document;

/// Extract the main article from `html`
///
/// Returns `None` when readability cannot identify an article or the article
/// has no visible text. Both candidates are plain text read from the article
/// HTML one block per line; the `markdown` candidate separates blocks with a
/// blank line.
pub fn extract_article(html: &str, url: &Url) -> Option<CandidateSet> {
    let mut cursor = Cursor::new(html.as_bytes());

    let product = match readability::extractor::extract(&mut cursor, url) {
        Ok(product) => product,
        Err(e) => {
            debug!("Readability found no article in {}: {}", url, e);
            return None;
        }
    };

    let blocks = Document::parse(&product.content).root().text_blocks();
    if blocks.is_empty() {
        debug!("Readability article for {} has no text", url);
        return None;
    }

    Some(CandidateSet {
        text: ExtractionCandidate::new(Format::Text, blocks.join("\n"), Strategy::Readability),
        markdown: ExtractionCandidate::new(
            Format::Markdown,
            blocks.join("\n\n"),
            Strategy::Readability,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading_page() -> String {
        let prose = "Readable prose about a single subject keeps going for a while. ".repeat(6);
        format!(
            "<html><head><title>Story</title></head><body><div><h2>Heading</h2><p>{prose}</p></div></body></html>"
        )
    }

    #[test]
    fn article_candidates_come_from_readability() {
        let body = "A paragraph with enough words, commas, and length to be scored as content. ".repeat(4);
        let html = format!(
            "<html><body><article><h1>Heading</h1><p>{body}</p><p>{body}</p></article></body></html>"
        );
        let url = Url::parse("https://example.com/a").unwrap();

        let set = extract_article(&html, &url).unwrap();
        assert_eq!(set.text.strategy, Strategy::Readability);
        assert!(set.text.content.contains("A paragraph with enough words"));
        assert!(set.markdown.content.contains("A paragraph with enough words"));
    }

    #[test]
    fn blocks_stay_separated() {
        let url = Url::parse("https://example.com/story").unwrap();
        let set = extract_article(&heading_page(), &url).unwrap();

        assert!(!set.text.content.contains("HeadingReadable"));
        assert!(set.text.content.lines().any(|line| line == "Heading"));
        assert!(set.text.content.contains("Heading\nReadable prose"));
    }

    #[test]
    fn markdown_candidate_is_plain_text() {
        let url = Url::parse("https://example.com/story").unwrap();
        let set = extract_article(&heading_page(), &url).unwrap();

        assert!(set.markdown.content.contains("Heading\n\nReadable prose"));
        assert!(!set.markdown.content.contains("---"));
        assert!(!set.markdown.content.contains('#'));
        assert!(!set.markdown.content.contains('<'));
    }

    #[test]
    fn empty_input_yields_nothing_useful() {
        let url = Url::parse("https://example.com/").unwrap();
        let text = extract_article("", &url)
            .map(|set| set.text.content)
            .unwrap_or_default();
        assert!(text.trim().is_empty());
    }
}
