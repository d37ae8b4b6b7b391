//! Streaming cleanup of raw HTML before readability scoring.
//!
//! Everything happens in a single `lol_html` rewriting pass: non-content
//! tags and comments are dropped, hidden elements are removed, elements
//! whose class or id marks them as boilerplate are unwrapped, and links and
//! images are made absolute against the page URL.

use std::sync::LazyLock;

use lol_html::html_content::Element as RewriterElement;
use lol_html::{HtmlRewriter, Settings, doc_comments, element};
use regex::Regex;
use url::Url;

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|cookie)",
    )
    .expect("unlikely pattern is valid")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(and|article|body|column|content|main|shadow|entry|post|story)").expect("candidate pattern is valid")
});

static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("hidden pattern is valid"));

/// Tags that never carry article content.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas", "template", "object"];

/// Tags never unwrapped even when their class looks unlikely.
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "article", "main", "a"];

/// Configuration for HTML preprocessing.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Drop script, style and other non-content tags.
    pub remove_non_content: bool,
    /// Drop HTML comments.
    pub remove_comments: bool,
    /// Unwrap elements whose class/id marks them as boilerplate.
    pub remove_unlikely: bool,
    /// Drop elements hidden through `hidden` or inline styles.
    pub remove_hidden: bool,
    /// Base URL for absolutizing links and images.
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_non_content: true, remove_comments: true, remove_unlikely: true, remove_hidden: true, base_url: None }
    }
}

/// Preprocesses HTML for scoring.
///
/// Returns the input unchanged if the rewriter rejects it.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut element_handlers = Vec::new();

    if config.remove_non_content {
        for tag in NON_CONTENT_TAGS {
            element_handlers.push(element!(*tag, |el| {
                el.remove();
                Ok(())
            }));
        }
    }

    if config.remove_hidden || config.remove_unlikely {
        let remove_hidden = config.remove_hidden;
        let remove_unlikely = config.remove_unlikely;
        element_handlers.push(element!("*", move |el| {
            if remove_hidden && is_hidden(el) {
                el.remove();
            } else if remove_unlikely && is_unlikely(el) {
                el.remove_and_keep_content();
            }
            Ok(())
        }));
    }

    if let Some(base_url) = &config.base_url {
        element_handlers.push(element!("a[href]", move |el| {
            absolutize(el, "href", base_url);
            Ok(())
        }));
        element_handlers.push(element!("img[src]", move |el| {
            absolutize(el, "src", base_url);
            Ok(())
        }));
    }

    let mut document_handlers = Vec::new();
    if config.remove_comments {
        document_handlers.push(doc_comments!(|c| {
            c.remove();
            Ok(())
        }));
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: element_handlers,
            document_content_handlers: document_handlers,
            ..Settings::new()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        tracing::debug!("preprocessing rejected the document, keeping it as-is");
        return html.to_string();
    }

    String::from_utf8_lossy(&output).into_owned()
}

fn is_hidden(el: &RewriterElement<'_, '_>) -> bool {
    el.has_attribute("hidden") || el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE.is_match(&style))
}

fn is_unlikely(el: &RewriterElement<'_, '_>) -> bool {
    if STRUCTURAL_TAGS.contains(&el.tag_name().as_str()) {
        return false;
    }

    let signature = format!(
        "{} {}",
        el.get_attribute("class").unwrap_or_default(),
        el.get_attribute("id").unwrap_or_default()
    );

    UNLIKELY.is_match(&signature) && !MAYBE_CANDIDATE.is_match(&signature)
}

fn absolutize(el: &mut RewriterElement<'_, '_>, attr: &str, base_url: &Url) {
    if let Some(value) = el.get_attribute(attr)
        && let Ok(absolute) = base_url.join(&value)
    {
        el.set_attribute(attr, absolute.as_str()).ok();
    }
}
