//! Three-tier article extraction.
//!
//! [`extract_article`] tries each tier in order and returns the first one
//! that yields content:
//!
//! 1. readability: score candidate containers, pick the best one plus its
//!    qualifying siblings, then clean the result;
//! 2. body: the document body's markup as-is;
//! 3. text snippet: the first 1000 characters of the document's text.
//!
//! # Example
//!
//! ```rust
//! use web2onenote_core::article::ExtractionTier;
//! use web2onenote_core::extract::extract_article;
//!
//! let article = extract_article("<html><body><span>Hi</span></body></html>", "https://example.com").unwrap();
//! assert_eq!(article.tier, ExtractionTier::Body);
//! assert_eq!(article.title, "Untitled");
//! ```

use std::cmp::Ordering;

use url::Url;

use crate::article::{Article, ExtractionTier, UNTITLED};
use crate::page::escape_xml;
use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html, strip_tags};
use crate::scoring::{ScoreConfig, ScoreResult, calculate_score, link_density};
use crate::{ClipperError, Result};

/// Characters kept by the text-snippet tier.
pub const SNIPPET_CHARS: usize = 1000;

/// Tags considered as potential content containers.
const CANDIDATE_TAGS: &[&str] = &["div", "article", "section", "main", "p", "td", "pre", "blockquote"];

/// Configuration for the readability tier.
///
/// # Example
///
/// ```rust
/// use web2onenote_core::extract::ExtractConfig;
///
/// let config = ExtractConfig::builder().min_score(25.0).char_threshold(300).build();
/// assert_eq!(config.min_score, 25.0);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score of the top candidate (default: 10.0).
    pub min_score: f64,
    /// Candidates kept after ranking (default: 5).
    pub max_top_candidates: usize,
    /// Text below a tenth of this is not scored (default: 500).
    pub char_threshold: usize,
    /// Elements scanned per candidate tag, 0 for unlimited (default: 1000).
    pub max_elements: usize,
    /// Siblings need at least this share of the top score (default: 0.2).
    pub sibling_threshold: f64,
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            max_top_candidates: 5,
            char_threshold: 500,
            max_elements: 1000,
            sibling_threshold: 0.2,
            postprocess: PostProcessConfig::default(),
        }
    }
}

impl ExtractConfig {
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder::default()
    }
}

/// Fluent builder for [`ExtractConfig`].
#[derive(Default)]
pub struct ExtractConfigBuilder {
    config: ExtractConfig,
}

impl ExtractConfigBuilder {
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    pub fn max_top_candidates(mut self, value: usize) -> Self {
        self.config.max_top_candidates = value;
        self
    }

    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    pub fn max_elements(mut self, value: usize) -> Self {
        self.config.max_elements = value;
        self
    }

    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    /// Keeps `class` attributes in the extracted markup.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.postprocess.keep_classes = value;
        self
    }

    pub fn build(self) -> ExtractConfig {
        self.config
    }
}

/// A scored content container.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    element: Element<'a>,
    score_result: ScoreResult,
}

impl<'a> Candidate<'a> {
    fn new(element: Element<'a>, score_result: ScoreResult) -> Self {
        Self { element, score_result }
    }

    fn score(&self) -> f64 {
        self.score_result.final_score
    }
}

/// Extracts an article with the default configuration.
///
/// # Errors
///
/// Returns [`ClipperError::ExtractionFailed`] when the document holds no
/// text at all.
pub fn extract_article(html: &str, source_url: &str) -> Result<Article> {
    extract_article_with_config(html, source_url, &ExtractConfig::default())
}

/// Extracts an article, falling through the tiers until one yields content.
pub fn extract_article_with_config(html: &str, source_url: &str, config: &ExtractConfig) -> Result<Article> {
    let raw = Document::parse(html);

    match readability_tier(&raw, html, source_url, config) {
        Ok(article) => {
            tracing::debug!(tier = "readability", "extraction succeeded");
            return Ok(article);
        }
        Err(e) => tracing::warn!(error = %e, "readability extraction failed, trying body"),
    }

    if let Some(article) = body_tier(&raw, source_url) {
        tracing::debug!(tier = "body", "extraction succeeded");
        return Ok(article);
    }
    tracing::warn!("document body is empty, falling back to a text snippet");

    text_tier(&raw, source_url)
        .ok_or_else(|| ClipperError::ExtractionFailed("the document contains no text".to_string()))
}

fn readability_tier(raw: &Document, html: &str, source_url: &str, config: &ExtractConfig) -> Result<Article> {
    let cleaned = Document::parse_with_preprocessing(html, Url::parse(source_url).ok());
    let content = extract_content(&cleaned, config)?;

    let title = raw.extract_title().unwrap_or_else(|| UNTITLED.to_string());
    let excerpt = raw.extract_excerpt().unwrap_or_default();

    Ok(Article::new(title, content, excerpt, source_url, ExtractionTier::Readability))
}

fn body_tier(raw: &Document, source_url: &str) -> Option<Article> {
    let body = raw.body_inner_html()?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let title = raw.title().unwrap_or_else(|| UNTITLED.to_string());

    Some(Article::new(title, body, "", source_url, ExtractionTier::Body))
}

fn text_tier(raw: &Document, source_url: &str) -> Option<Article> {
    let text = raw.text_content();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let snippet: String = text.chars().take(SNIPPET_CHARS).collect();
    let content = format!("<div>{}</div>", escape_xml(&snippet));
    let title = raw.title().unwrap_or_else(|| UNTITLED.to_string());

    Some(Article::new(title, content, "", source_url, ExtractionTier::TextSnippet))
}

/// Runs readability scoring on an already preprocessed document and returns
/// the cleaned markup of the winning content.
///
/// # Errors
///
/// [`ClipperError::NoContent`] when nothing qualifies as a candidate or the
/// cleaned result is empty, [`ClipperError::NotReadable`] when the best
/// candidate scores below [`ExtractConfig::min_score`].
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<String> {
    let score_config = ScoreConfig::default();

    let candidates = identify_candidates(doc, config, &score_config);
    let mut candidates = propagate_scores(candidates, &score_config);

    candidates.sort_by(|a, b| rank(b, a));
    candidates.truncate(config.max_top_candidates.max(1));

    let top = candidates.first().ok_or(ClipperError::NoContent)?;
    if top.score() < config.min_score {
        return Err(ClipperError::NotReadable { score: top.score(), threshold: config.min_score });
    }

    let mut content = top.element.outer_html();
    for sibling in select_siblings(top, &candidates, config) {
        content.push('\n');
        content.push_str(&sibling.outer_html());
    }

    let content = postprocess_html(&content, &config.postprocess);
    if strip_tags(&content).trim().is_empty() {
        return Err(ClipperError::NoContent);
    }

    Ok(content)
}

fn identify_candidates<'a>(doc: &'a Document, config: &ExtractConfig, score_config: &ScoreConfig) -> Vec<Candidate<'a>> {
    let max_elements = if config.max_elements == 0 { usize::MAX } else { config.max_elements };
    let min_chars = config.char_threshold / 10;

    CANDIDATE_TAGS
        .iter()
        .flat_map(|tag| doc.select(tag).unwrap_or_default().into_iter().take(max_elements))
        .filter(|element| {
            matches!(element.tag_name().as_str(), "article" | "section" | "main")
                || element.text().trim().chars().count() >= min_chars
        })
        .map(|element| {
            let score_result = calculate_score(&element, score_config);
            Candidate::new(element, score_result)
        })
        .collect()
}

/// Adds half of each candidate's score to its parent and a third to its
/// grandparent. Ancestors that were not candidates join the list with their
/// own score plus the boost. `body` and `html` never receive a boost.
fn propagate_scores<'a>(candidates: Vec<Candidate<'a>>, score_config: &ScoreConfig) -> Vec<Candidate<'a>> {
    let mut scored = candidates.clone();

    for candidate in &candidates {
        let boost = candidate.score();
        let mut ancestor = candidate.element.parent();

        for divisor in [2.0, 3.0] {
            let Some(element) = ancestor else { break };
            if matches!(element.tag_name().as_str(), "body" | "html") {
                break;
            }

            match scored.iter_mut().find(|c| c.element == element) {
                Some(existing) => existing.score_result.final_score += boost / divisor,
                None => {
                    let mut score_result = calculate_score(&element, score_config);
                    score_result.final_score += boost / divisor;
                    scored.push(Candidate::new(element.clone(), score_result));
                }
            }

            ancestor = element.parent();
        }
    }

    scored
}

/// Orders by score, then container priority, then text length.
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score()
        .total_cmp(&b.score())
        .then_with(|| container_priority(&a.element).cmp(&container_priority(&b.element)))
        .then_with(|| a.element.text().chars().count().cmp(&b.element.text().chars().count()))
}

fn container_priority(element: &Element<'_>) -> u8 {
    match element.tag_name().as_str() {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}

/// Siblings share the top candidate's parent and score at least
/// `top * sibling_threshold`. Paragraphs additionally need more than 80
/// characters and a link density under 0.25.
fn select_siblings<'a>(top: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig) -> Vec<Element<'a>> {
    let Some(top_parent) = top.element.parent() else {
        return Vec::new();
    };
    let threshold = top.score() * config.sibling_threshold;

    candidates
        .iter()
        .filter(|c| c.element != top.element && c.score() >= threshold)
        .filter(|c| c.element.parent().as_ref() == Some(&top_parent))
        .filter(|c| {
            c.element.tag_name() != "p"
                || (c.element.text().chars().count() > 80 && link_density(&c.element) < 0.25)
        })
        .map(|c| c.element.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <html>
        <head>
            <title>Fallback Title</title>
            <meta property="og:title" content="Open Graph Title">
            <meta name="description" content="A short summary.">
        </head>
        <body>
            <nav class="menu"><a href="/">Home</a> <a href="/about">About</a></nav>
            <div class="sidebar">Subscribe for more updates and offers.</div>
            <article class="post-content">
                <h1>The Heading</h1>
                <p>The first paragraph of the story has plenty of words, several commas, and enough length to count as real prose.</p>
                <p>A second paragraph continues the argument, adding detail, context, and a <a href="/ref">reference</a> along the way.</p>
                <p>The third paragraph wraps up the piece, with a conclusion, a summary, and a final thought for the reader.</p>
            </article>
            <footer>Copyright notice</footer>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_config_builder() {
        let config = ExtractConfig::builder()
            .min_score(30.0)
            .max_top_candidates(3)
            .sibling_threshold(0.5)
            .keep_classes(true)
            .build();

        assert_eq!(config.min_score, 30.0);
        assert_eq!(config.max_top_candidates, 3);
        assert_eq!(config.sibling_threshold, 0.5);
        assert!(config.postprocess.keep_classes);
        assert_eq!(config.char_threshold, 500);
    }

    #[test]
    fn test_readability_tier() {
        let article = extract_article(ARTICLE_HTML, "https://example.com/article").unwrap();

        assert_eq!(article.tier, ExtractionTier::Readability);
        assert_eq!(article.title, "Open Graph Title");
        assert_eq!(article.excerpt, "A short summary.");
        assert!(article.content.contains("first paragraph"));
        assert!(article.content.contains("third paragraph"));
        assert!(!article.content.contains("Subscribe"));
        assert!(!article.content.contains("Copyright"));
    }

    #[test]
    fn test_readability_absolutizes_links() {
        let article = extract_article(ARTICLE_HTML, "https://example.com/article").unwrap();
        assert!(article.content.contains(r#"href="https://example.com/ref""#));
    }

    #[test]
    fn test_body_tier_with_title() {
        let html = "<html><head><title>Short Page</title></head><body><div>Hello there</div></body></html>";
        let article = extract_article(html, "https://example.com").unwrap();

        assert_eq!(article.tier, ExtractionTier::Body);
        assert_eq!(article.title, "Short Page");
        assert_eq!(article.content, "<div>Hello there</div>");
        assert_eq!(article.excerpt, "");
    }

    #[test]
    fn test_body_tier_untitled() {
        let article = extract_article("<p>tiny</p>", "https://example.com").unwrap();

        assert_eq!(article.tier, ExtractionTier::Body);
        assert_eq!(article.title, UNTITLED);
    }

    #[test]
    fn test_text_snippet_tier() {
        let title = "a".repeat(1500);
        let html = format!("<html><head><title>{title}</title></head><body>   </body></html>");
        let article = extract_article(&html, "https://example.com").unwrap();

        assert_eq!(article.tier, ExtractionTier::TextSnippet);
        assert_eq!(article.content, format!("<div>{}</div>", "a".repeat(SNIPPET_CHARS)));
    }

    #[test]
    fn test_text_snippet_is_escaped() {
        let html = "<html><head><title>Fish &amp; Chips &lt;3</title></head><frameset></frameset></html>";
        let article = extract_article(html, "https://example.com").unwrap();

        assert_eq!(article.tier, ExtractionTier::TextSnippet);
        assert_eq!(article.content, "<div>Fish &amp; Chips &lt;3</div>");
    }

    #[test]
    fn test_empty_document_fails() {
        let result = extract_article("", "https://example.com");
        assert!(matches!(result, Err(ClipperError::ExtractionFailed(_))));
    }

    #[test]
    fn test_not_readable_below_threshold() {
        let doc = Document::parse(&format!("<div>{}</div>", "plain words ".repeat(10)));
        let config = ExtractConfig::builder().min_score(100.0).build();

        assert!(matches!(extract_content(&doc, &config), Err(ClipperError::NotReadable { .. })));
    }

    #[test]
    fn test_no_candidates() {
        let doc = Document::parse("<span>short</span>");
        assert!(matches!(extract_content(&doc, &ExtractConfig::default()), Err(ClipperError::NoContent)));
    }

    #[test]
    fn test_element_cap_applies_per_tag() {
        let prose = "A paragraph long enough to be scored, with commas, clauses, and a little more text to read.";
        let html = format!("{}<article><p>{prose}</p><p>{prose}</p></article>", "<div>x</div>".repeat(10));
        let doc = Document::parse(&html);
        let config = ExtractConfig::builder().max_elements(5).build();

        let content = extract_content(&doc, &config).unwrap();
        assert!(content.starts_with("<article>"));
        assert!(content.contains("A paragraph long enough"));
    }

    #[test]
    fn test_propagation_prefers_container() {
        let paragraph = "Plenty of text in this paragraph, with commas, clauses, and more words to score. ";
        let html = format!(
            r#"<div id="outer"><div id="story"><p>{p}</p><p>{p}</p><p>{p}</p></div></div>"#,
            p = paragraph.repeat(3)
        );
        let doc = Document::parse(&html);
        let content = extract_content(&doc, &ExtractConfig::default()).unwrap();

        assert!(content.starts_with("<div"));
        assert_eq!(content.matches("<p>").count(), 3);
    }
}
