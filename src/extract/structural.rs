//! Structural heuristics over the typed DOM

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::{Document, Element};

/// Removed before either structural pass
pub(crate) const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript",
];

const TEXT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "span", "div", "a",
];

static CONTENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)content|main|post|article").expect("static regex")
});

/// Main content container: `main`, `article`, a content-like class, `body`, root
pub fn find_container(document: &Document) -> &Element {
    document
        .find_tag("main")
        .or_else(|| document.find_tag("article"))
        .or_else(|| {
            document.find(|el| el.attr("class").is_some_and(|class| CONTENT_CLASS.is_match(class)))
        })
        .or_else(|| document.find_tag("body"))
        .unwrap_or_else(|| document.root())
}

/// Text fragments longer than `min_fragment` characters, one per line
pub fn structural_text(document: &Document, min_fragment: usize) -> String {
    find_container(document)
        .descendants()
        .filter(|el| TEXT_TAGS.contains(&el.tag()))
        .map(Element::text)
        .filter(|text| text.chars().count() > min_fragment)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown rendering of headings, paragraphs, links, list items and images
pub fn structural_markdown(document: &Document) -> String {
    find_container(document)
        .descendants()
        .filter_map(markdown_part)
        .collect::<Vec<_>>()
        .join("\n")
}

fn markdown_part(el: &Element) -> Option<String> {
    match el.tag() {
        "h1" => Some(format!("\n# {}\n", el.text())),
        "h2" => Some(format!("\n## {}\n", el.text())),
        "h3" => Some(format!("\n### {}\n", el.text())),
        "h4" => Some(format!("\n#### {}\n", el.text())),
        "p" => non_empty(el.text()).map(|text| format!("{text}\n")),
        "a" => {
            let href = el.attr("href").filter(|href| !href.is_empty())?;
            non_empty(el.text()).map(|text| format!("[{text}]({href})"))
        }
        "li" => non_empty(el.text()).map(|text| format!("- {text}\n")),
        "img" => {
            let src = el.attr("src").filter(|src| !src.is_empty())?;
            let alt = el.attr("alt").unwrap_or("image");
            Some(format!("![{alt}]({src})\n"))
        }
        _ => None,
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
