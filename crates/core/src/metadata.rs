//! Title and excerpt lookup for the readability tier.
//!
//! Both lookups walk a priority list of structured sources before falling
//! back to the visible markup. They must run on the raw document: the
//! preprocessing pass removes the JSON-LD scripts they read.

use serde_json::Value;

use crate::parse::Document;

/// Paragraphs shorter than this are not used as an excerpt.
const MIN_EXCERPT_PARAGRAPH: usize = 50;
/// Paragraph excerpts are cut to this many characters.
const MAX_EXCERPT_CHARS: usize = 300;

impl Document {
    /// Extracts the article title with priority fallback:
    /// 1. JSON-LD `headline`
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. `<title>` element
    /// 5. First `<h1>` element
    pub fn extract_title(&self) -> Option<String> {
        self.json_ld_string("headline")
            .or_else(|| self.meta_content("og:title"))
            .or_else(|| self.meta_content("twitter:title"))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1"))
    }

    /// Extracts a short summary with priority fallback:
    /// 1. JSON-LD `description`
    /// 2. Open Graph `og:description`
    /// 3. Meta `description`
    /// 4. First substantial paragraph, cut to 300 characters
    pub fn extract_excerpt(&self) -> Option<String> {
        self.json_ld_string("description")
            .or_else(|| self.meta_content("og:description"))
            .or_else(|| self.meta_content("description"))
            .or_else(|| self.first_paragraph_excerpt())
    }

    fn first_paragraph_excerpt(&self) -> Option<String> {
        let paragraphs = self.select("p").ok()?;

        paragraphs.iter().take(5).find_map(|p| {
            let text = p.text();
            let text = text.trim();
            (text.chars().count() > MIN_EXCERPT_PARAGRAPH).then(|| truncate_chars(text, MAX_EXCERPT_CHARS))
        })
    }

    fn first_text(&self, selector: &str) -> Option<String> {
        let elements = self.select(selector).ok()?;
        let text = elements.first()?.text();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// Gets a meta tag's content by `name` or `property`.
    fn meta_content(&self, key: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|attr| {
            let elements = self.select(&format!("meta[{attr}=\"{key}\"]")).ok()?;
            let content = elements.first()?.attr("content")?.trim();
            (!content.is_empty()).then(|| content.to_string())
        })
    }

    /// Finds a string field in the first JSON-LD block that carries it.
    fn json_ld_string(&self, field: &str) -> Option<String> {
        let scripts = self.select("script[type=\"application/ld+json\"]").ok()?;

        scripts.iter().find_map(|script| {
            let value: Value = serde_json::from_str(script.raw_text().trim()).ok()?;
            find_field(&value, field)
        })
    }
}

/// Looks for `field` on the object itself, then inside arrays and `@graph`.
fn find_field(value: &Value, field: &str) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| map.get("@graph").and_then(|graph| find_field(graph, field))),
        Value::Array(items) => items.iter().find_map(|item| find_field(item, field)),
        _ => None,
    }
}

/// Cuts `text` to `max` characters, appending `...` when it was longer.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
