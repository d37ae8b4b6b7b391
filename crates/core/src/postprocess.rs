//! Cleanup of extracted article markup.
//!
//! Runs after the readability tier has assembled its content: conditional
//! comments and class attributes go, empty wrappers are pruned, and link
//! farms that survived scoring are dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CONDITIONAL_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->|<!--<!\[if[^\]]*\]>.*?<!\[endif\]-->")
        .expect("conditional comment pattern is valid")
});

static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+class=("[^"]*"|'[^']*')"#).expect("class pattern is valid"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<a\b[^>]*>(.*?)</a\s*>").expect("link pattern is valid"));

/// Wrappers pruned when they hold nothing but whitespace or `<br>`.
const PRUNABLE_TAGS: &[&str] = &["div", "p", "span", "section", "article", "aside", "nav", "header", "footer"];

/// Blocks checked for link density. Innermost matches only.
const LINK_BLOCK_TAGS: &[&str] = &["div", "p", "section", "aside", "nav", "ul", "li"];

static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PRUNABLE_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>\s*(?:<br\s*/?>\s*)*</{tag}\s*>"))
                .expect("empty node pattern is valid")
        })
        .collect()
});

static LINK_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LINK_BLOCK_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>((?:[^<]|<[^{}/]|</[^{}])*?)</{tag}\s*>", &tag[..1], &tag[..1]))
                .expect("link block pattern is valid")
        })
        .collect()
});

/// Configuration for post-processing cleanup.
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    pub remove_conditional_comments: bool,
    /// Keep `class` attributes (stripped by default).
    pub keep_classes: bool,
    pub remove_empty_nodes: bool,
    /// Upper bound on empty-node pruning passes.
    pub max_empty_node_passes: usize,
    pub remove_high_link_density: bool,
    /// Blocks whose link text exceeds this share of their text are dropped.
    pub max_link_density: f64,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_conditional_comments: true,
            keep_classes: false,
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            remove_high_link_density: true,
            max_link_density: 0.5,
        }
    }
}

/// Post-processes extracted HTML.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = html.to_string();

    if config.remove_conditional_comments {
        processed = CONDITIONAL_COMMENT.replace_all(&processed, "").into_owned();
    }

    if !config.keep_classes {
        processed = CLASS_ATTR.replace_all(&processed, "").into_owned();
    }

    if config.remove_high_link_density {
        processed = remove_high_link_density_nodes(&processed, config.max_link_density);
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    processed
}

/// Text with all tags removed.
pub(crate) fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();

    for _ in 0..max_passes {
        let before = result.len();
        for re in EMPTY_NODES.iter() {
            result = re.replace_all(&result, "").into_owned();
        }
        if result.len() == before {
            break;
        }
    }

    result
}

fn remove_high_link_density_nodes(html: &str, max_density: f64) -> String {
    let mut result = html.to_string();

    for re in LINK_BLOCKS.iter() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                let whole = &caps[0];
                let inner = &caps[1];
                let text_length = strip_tags(inner).trim().chars().count();
                if text_length == 0 {
                    return whole.to_string();
                }

                let link_length: usize = LINK
                    .captures_iter(inner)
                    .map(|link| strip_tags(&link[1]).trim().chars().count())
                    .sum();

                if link_length as f64 / text_length as f64 > max_density { String::new() } else { whole.to_string() }
            })
            .into_owned();
    }

    result
}
