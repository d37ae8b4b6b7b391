//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! extraction tier: the readability scorer walks [`Element`] ancestors, the
//! body tier reads [`Document::body_inner_html`], and the text tier reads
//! [`Document::text_content`].
//!
//! # Example
//!
//! ```rust
//! use web2onenote_core::parse::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hello</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.body_inner_html().as_deref(), Some("<p>Hello</p>"));
//! ```

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::{ClipperError, Result};

/// Elements whose text never counts as page text.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// A parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML without any cleaning.
    ///
    /// Parsing is lenient: any input, including plain text, yields a document.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses HTML after running the readability preprocessing pass.
    ///
    /// `base_url` is used to absolutize links and image sources.
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Self {
        let config = PreprocessConfig { base_url: base_url.clone(), ..Default::default() };
        let cleaned = preprocess_html(html, &config);

        Self { html: Html::parse_document(&cleaned), base_url }
    }

    /// Gets the base URL used for preprocessing.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ClipperError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Gets the trimmed content of the `<title>` element, if non-empty.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Gets the markup inside `<body>`.
    ///
    /// Returns `None` for documents without a body element (framesets).
    pub fn body_inner_html(&self) -> Option<String> {
        let selector = Selector::parse("body").ok()?;
        self.html.select(&selector).next().map(|body| body.inner_html())
    }

    /// Gets the document's plain text, skipping script and style contents.
    pub fn text_content(&self) -> String {
        visible_text(self.html.root_element())
    }
}

/// A wrapper around scraper's ElementRef.
///
/// Two elements compare equal when they are the same node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the visible text content of this element.
    pub fn text(&self) -> String {
        visible_text(self.element)
    }

    /// Gets every text node, including script and style contents.
    pub fn raw_text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// The nearest element ancestor.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element
            .ancestors()
            .find_map(ElementRef::wrap)
            .map(Element::new)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ClipperError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ClipperError::HtmlParseError(format!("Invalid selector: {}", e)))
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut text = String::new();

    for node in root.descendants() {
        if let Node::Text(chunk) = node.value() {
            let hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| NON_TEXT_TAGS.contains(&el.value().name()));
            if !hidden {
                text.push_str(chunk);
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title> Test Page </title>
            <script>var tracking = 1;</script>
        </head>
        <body>
            <h1>Heading</h1>
            <div id="wrap"><p class="content">Paragraph 1</p></div>
            <p class="content">Paragraph 2</p>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_missing_or_blank_title() {
        assert_eq!(Document::parse("<p>x</p>").title(), None);
        assert_eq!(Document::parse("<title>   </title><p>x</p>").title(), None);
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML);
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
        assert_eq!(elements[1].text(), "Paragraph 2");
    }

    #[test]
    fn test_element_parent() {
        let doc = Document::parse(SAMPLE_HTML);
        let first = doc.select("p.content").unwrap().remove(0);
        let parent = first.parent().unwrap();

        assert_eq!(parent.tag_name(), "div");
        assert_eq!(parent.attr("id"), Some("wrap"));
        assert_eq!(parent.parent().unwrap().tag_name(), "body");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML);
        assert!(matches!(doc.select("[[invalid"), Err(ClipperError::HtmlParseError(_))));
    }

    #[test]
    fn test_text_content_skips_scripts() {
        let doc = Document::parse(SAMPLE_HTML);
        let text = doc.text_content();

        assert!(text.contains("Heading"));
        assert!(text.contains("Paragraph 2"));
        assert!(!text.contains("tracking"));
    }

    #[test]
    fn test_body_inner_html() {
        let doc = Document::parse("<html><body><p>Body</p></body></html>");
        assert_eq!(doc.body_inner_html(), Some("<p>Body</p>".to_string()));
    }

    #[test]
    fn test_frameset_has_no_body() {
        let doc = Document::parse("<html><head><title>F</title></head><frameset><frame src=\"a.html\"></frameset></html>");
        assert_eq!(doc.body_inner_html(), None);
    }
}
