//! Owned, typed DOM used by every HTML consumer in the crate
//!
//! The `scraper` parse is converted once into a plain tree of [`Element`] and
//! text [`Node`]s. Extractors, the quality detector and the html serializer
//! walk this tree through tag names, attributes, children and text content,
//! never through the parser's own node types.

use scraper::Html;

/// Elements whose text never reaches a reader
const NON_VISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements whose text children are serialized without escaping
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "xmp", "iframe"];

/// Elements that start a new line of reading text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

/// A parsed HTML document rooted at its `<html>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse a full HTML document.
    ///
    /// Parsing never fails: html5ever recovers from malformed markup and always
    /// produces an `<html>` root with `<head>` and `<body>`. Content below
    /// [`MAX_DEPTH`] is kept as text only.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let root = convert_element(parsed.root_element());
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// First element in document order satisfying `predicate`, the root included
    pub fn find(&self, predicate: impl Fn(&Element) -> bool) -> Option<&Element> {
        if predicate(&self.root) {
            return Some(&self.root);
        }
        self.root.find(predicate)
    }

    /// First element with the given tag name
    pub fn find_tag(&self, tag: &str) -> Option<&Element> {
        self.find(|el| el.tag == tag)
    }

    /// Visible text of the whole document, whitespace-collapsed
    pub fn text(&self) -> String {
        self.root.text()
    }

    pub fn to_html(&self) -> String {
        self.root.outer_html()
    }
}

/// Elements nested deeper than this are flattened into their visible text
pub const MAX_DEPTH: usize = 256;

/// Build the owned tree without recursion; the parse can be arbitrarily deep
fn convert_element(root: scraper::ElementRef<'_>) -> Element {
    let mut stack = vec![(shell(root.value()), root.children())];

    loop {
        let depth = stack.len();
        let Some((parent, children)) = stack.last_mut() else {
            break;
        };
        match children.next() {
            Some(child) => match child.value() {
                scraper::Node::Text(text) => parent.children.push(Node::Text(text.to_string())),
                scraper::Node::Element(value) if depth < MAX_DEPTH => {
                    stack.push((shell(value), child.children()));
                }
                scraper::Node::Element(_) => {
                    let mut flattened = String::new();
                    for node in child.descendants() {
                        let scraper::Node::Text(text) = node.value() else {
                            continue;
                        };
                        let hidden = node
                            .parent()
                            .and_then(|p| p.value().as_element())
                            .is_some_and(|el| NON_VISIBLE_TAGS.contains(&el.name()));
                        if !hidden {
                            flattened.push_str(text);
                        }
                    }
                    if !flattened.is_empty() {
                        parent.children.push(Node::Text(flattened));
                    }
                }
                _ => {}
            },
            None => {
                let Some((finished, _)) = stack.pop() else {
                    break;
                };
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(Node::Element(finished)),
                    None => return finished,
                }
            }
        }
    }

    Element::new("html")
}

fn shell(value: &scraper::node::Element) -> Element {
    Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(name, val)| (name.to_string(), val.to_string()))
            .collect(),
        children: Vec::new(),
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Descendant elements in document order, excluding `self`
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// First descendant in document order satisfying `predicate`
    pub fn find(&self, predicate: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.descendants().find(|el| predicate(el))
    }

    /// Remove every descendant element whose tag is in `tags`
    pub fn strip(&mut self, tags: &[&str]) {
        let mut pending: Vec<&mut Element> = vec![self];
        while let Some(el) = pending.pop() {
            el.children.retain(|child| match child {
                Node::Element(el) => !tags.contains(&el.tag.as_str()),
                Node::Text(_) => true,
            });
            for child in el.children.iter_mut() {
                if let Node::Element(child) = child {
                    pending.push(child);
                }
            }
        }
    }

    /// Visible text with whitespace runs collapsed to one space and trimmed
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.collect_text(&mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut String) {
        if NON_VISIBLE_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        let mut stack = vec![self.children.iter()];
        while let Some(siblings) = stack.last_mut() {
            match siblings.next() {
                Some(Node::Text(text)) => out.push_str(text),
                Some(Node::Element(el)) => {
                    if !NON_VISIBLE_TAGS.contains(&el.tag.as_str()) {
                        stack.push(el.children.iter());
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Visible text split at block-level elements, one collapsed line per block
    pub fn text_blocks(&self) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut line = String::new();
        if NON_VISIBLE_TAGS.contains(&self.tag.as_str()) {
            return blocks;
        }

        let mut stack = vec![(self.children.iter(), false)];
        while let Some((siblings, _)) = stack.last_mut() {
            match siblings.next() {
                Some(Node::Text(text)) => line.push_str(text),
                Some(Node::Element(el)) if NON_VISIBLE_TAGS.contains(&el.tag.as_str()) => {}
                Some(Node::Element(el)) => {
                    let block = BLOCK_TAGS.contains(&el.tag.as_str());
                    if block {
                        flush_block(&mut line, &mut blocks);
                    }
                    stack.push((el.children.iter(), block));
                }
                None => {
                    if let Some((_, true)) = stack.pop() {
                        flush_block(&mut line, &mut blocks);
                    }
                }
            }
        }
        flush_block(&mut line, &mut blocks);
        blocks
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        if !self.write_open_tag(out) {
            return;
        }

        let mut stack = vec![(self, self.children.iter())];
        while let Some((el, children)) = stack.last_mut() {
            match children.next() {
                Some(Node::Text(text)) if RAW_TEXT_TAGS.contains(&el.tag.as_str()) => {
                    out.push_str(text)
                }
                Some(Node::Text(text)) => escape_into(text, false, out),
                Some(Node::Element(child)) => {
                    if child.write_open_tag(out) {
                        stack.push((child, child.children.iter()));
                    }
                }
                None => {
                    out.push_str("</");
                    out.push_str(&el.tag);
                    out.push('>');
                    stack.pop();
                }
            }
        }
    }

    /// Writes `<tag attrs>`; `false` for void elements, which take no body
    fn write_open_tag(&self, out: &mut String) -> bool {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
        out.push('>');

        !VOID_TAGS.contains(&self.tag.as_str())
    }
}

fn flush_block(line: &mut String, blocks: &mut Vec<String>) {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        blocks.push(collapsed);
    }
    line.clear();
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

/// Pre-order iterator over descendant elements
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(siblings) = self.stack.last_mut() {
            match siblings.next() {
                Some(Node::Element(el)) => {
                    self.stack.push(el.children.iter());
                    return Some(el);
                }
                Some(Node::Text(_)) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}
