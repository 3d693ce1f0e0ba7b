use serde::{Deserialize, Serialize};

use crate::dom::{Document, Element};

/// Head metadata of a scraped page
///
/// Every field is `""` when the page does not provide it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub published_date: String,
}

/// Extract title, description, author and publish date
///
/// Title comes from the first `<title>`; description and author from
/// `<meta name=... content=...>`; the date from
/// `<meta property="article:published_time">`. Values are trimmed.
pub fn extract_metadata(document: &Document, url: &str) -> PageMetadata {
    PageMetadata {
        url: url.to_string(),
        title: document
            .find_tag("title")
            .map(|title| title.text())
            .unwrap_or_default(),
        description: meta_content(document, "name", "description"),
        author: meta_content(document, "name", "author"),
        published_date: meta_content(document, "property", "article:published_time"),
    }
}

fn meta_content(document: &Document, key: &str, value: &str) -> String {
    document
        .find(|el: &Element| el.tag() == "meta" && el.attr(key) == Some(value))
        .and_then(|meta| meta.attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_all_fields() {
        let html = r#"<html><head>
            <title>  Breaking News </title>
            <meta name="description" content=" What happened today ">
            <meta name="author" content="Ayşe Yılmaz">
            <meta property="article:published_time" content="2024-05-01T10:00:00Z">
        </head><body></body></html>"#;

        let metadata = extract_metadata(&Document::parse(html), "https://news.example/a");
        assert_eq!(
            metadata,
            PageMetadata {
                url: "https://news.example/a".to_string(),
                title: "Breaking News".to_string(),
                description: "What happened today".to_string(),
                author: "Ayşe Yılmaz".to_string(),
                published_date: "2024-05-01T10:00:00Z".to_string(),
            }
        );
    }

    #[test]
    fn missing_author_is_empty() {
        let html = r#"<html><head><title>T</title><meta name="description" content="d"></head></html>"#;
        let metadata = extract_metadata(&Document::parse(html), "https://x.example/");
        assert_eq!(metadata.author, "");
        assert_eq!(metadata.published_date, "");
        assert_eq!(metadata.title, "T");
    }

    #[test]
    fn meta_without_content_is_empty() {
        let html = r#"<head><meta name="author"></head>"#;
        let metadata = extract_metadata(&Document::parse(html), "");
        assert_eq!(metadata.author, "");
        assert_eq!(metadata.title, "");
    }
}
