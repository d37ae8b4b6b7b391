//! The extracted article and its output formats.
//!
//! An [`Article`] only exists once an extraction succeeded. After that it is
//! changed solely through the user edits [`Article::set_title`] and
//! [`Article::set_content`], and it is replaced wholesale by the next
//! extraction.

use serde::Serialize;

use crate::Result;
use crate::parse::Document;

/// Placeholder title used when a page has none.
pub const UNTITLED: &str = "Untitled";

/// Output format options for article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The extracted markup.
    Html,
    /// Plain text with all tags stripped.
    Text,
    /// The whole article as JSON.
    Json,
}

/// Which extraction tier produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Scored main-content extraction.
    Readability,
    /// The document body as-is.
    Body,
    /// A plain-text snippet of the document.
    TextSnippet,
}

/// A readable article ready to be edited and published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    /// Content as HTML markup.
    pub content: String,
    /// Short summary, possibly empty.
    pub excerpt: String,
    /// The page the article was taken from.
    pub source_url: String,
    pub tier: ExtractionTier,
}

impl Article {
    pub fn new(
        title: impl Into<String>, content: impl Into<String>, excerpt: impl Into<String>,
        source_url: impl Into<String>, tier: ExtractionTier,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            excerpt: excerpt.into(),
            source_url: source_url.into(),
            tier,
        }
    }

    /// Replaces the title with a user edit.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Replaces the content with a user edit.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Plain text of the content.
    pub fn text_content(&self) -> String {
        Document::parse(&self.content).text_content().trim().to_string()
    }

    /// Renders the article in the requested format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content.clone()),
            OutputFormat::Text => Ok(self.text_content()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Article {
        Article::new(
            "A Title",
            "<p>Hello <b>world</b></p>",
            "Greeting",
            "https://example.com/a",
            ExtractionTier::Readability,
        )
    }

    #[test]
    fn test_user_edits() {
        let mut article = sample();
        article.set_title("Edited");
        article.set_content("<p>New</p>");

        assert_eq!(article.title, "Edited");
        assert_eq!(article.content, "<p>New</p>");
        assert_eq!(article.source_url, "https://example.com/a");
    }

    #[test]
    fn test_text_format() {
        assert_eq!(sample().to_format(OutputFormat::Text).unwrap(), "Hello world");
        assert_eq!(sample().to_format(OutputFormat::Html).unwrap(), "<p>Hello <b>world</b></p>");
    }

    #[test]
    fn test_json_format() {
        let json = sample().to_format(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["title"], "A Title");
        assert_eq!(value["tier"], "readability");
        assert_eq!(value["source_url"], "https://example.com/a");
    }
}
