//! Candidate scoring for the readability tier.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Class/id fragments that suggest an element holds the main content.
static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)")
        .expect("positive pattern is valid")
});

/// Class/id fragments that suggest boilerplate.
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|share|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|subscribe)",
    )
    .expect("negative pattern is valid")
});

/// Weights used when scoring candidates.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Bonus for a positive class/id.
    pub positive_weight: f64,
    /// Penalty for a negative class/id.
    pub negative_weight: f64,
    /// Cap on the text-length component.
    pub max_char_density_score: f64,
    /// Cap on the comma component.
    pub max_comma_density_score: f64,
    /// Characters per text-length point.
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Breakdown of an element's score.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub tag_name: String,
    pub base_score: f64,
    pub class_weight: f64,
    pub content_density: f64,
    /// Link text over total text, 0.0 to 1.0.
    pub link_density: f64,
    pub final_score: f64,
}

/// Base score from the tag name.
///
/// Containers that usually wrap prose score positively; headings,
/// navigation and list scaffolding score negatively.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" | "main" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Class/id adjustment. The id is checked before the classes and a
/// positive match wins over a negative one within the same value.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let id = element.attr("id").into_iter();
    let classes = element.attr("class").into_iter().flat_map(str::split_whitespace);

    for name in id.chain(classes) {
        if POSITIVE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Text-length and comma density component.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    density_of(&element.text(), config)
}

fn density_of(text: &str, config: &ScoreConfig) -> f64 {
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Ratio of link text to all text in the element.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum();

    link_length as f64 / text_length as f64
}

/// Scores an element.
///
/// `(base + class weight + density) * (1 - link density)`, with the link
/// penalty halved for elements that carry a positive class/id or more than
/// 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let text = element.text();
    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = density_of(&text, config);
    let ld = link_density(element);

    let lenient = class_weight > 0.0 || text.chars().count() > 500;
    let link_penalty = if lenient { 1.0 - ld * 0.5 } else { 1.0 - ld };

    let final_score = (base_score + class_weight + content_density) * link_penalty;

    ScoreResult { tag_name: element.tag_name(), base_score, class_weight, content_density, link_density: ld, final_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;
    use rstest::rstest;

    fn first<'a>(doc: &'a Document, selector: &str) -> Element<'a> {
        doc.select(selector).unwrap().into_iter().next().unwrap()
    }

    #[rstest]
    #[case("<article>x</article>", "article", 10.0)]
    #[case("<section>x</section>", "section", 8.0)]
    #[case("<div>x</div>", "div", 5.0)]
    #[case("<blockquote>x</blockquote>", "blockquote", 3.0)]
    #[case("<form>x</form>", "form", -3.0)]
    #[case("<nav>x</nav>", "nav", -5.0)]
    #[case("<p>x</p>", "p", 0.0)]
    fn test_base_tag_score(#[case] html: &str, #[case] tag: &str, #[case] expected: f64) {
        let doc = Document::parse(html);
        assert_eq!(base_tag_score(&first(&doc, tag)), expected);
    }

    #[rstest]
    #[case(r#"<div class="article-content">x</div>"#, 25.0)]
    #[case(r#"<div class="sidebar">x</div>"#, -25.0)]
    #[case(r#"<div id="main-content">x</div>"#, 25.0)]
    #[case(r#"<div class="container" id="wrapper">x</div>"#, 0.0)]
    #[case(r#"<div id="comments" class="post">x</div>"#, -25.0)]
    fn test_class_id_weight(#[case] html: &str, #[case] expected: f64) {
        let doc = Document::parse(html);
        assert_eq!(class_id_weight(&first(&doc, "div"), &ScoreConfig::default()), expected);
    }

    #[test]
    fn test_content_density() {
        let config = ScoreConfig::default();
        assert_eq!(density_of("Short text here.", &config), 0.0);
        assert_eq!(density_of("one, two, three, four, five", &config), 3.0);
        assert_eq!(density_of(&"a".repeat(500), &config), 3.0);
    }

    #[test]
    fn test_link_density() {
        let doc = Document::parse(r##"<div id="a">No links.</div><div id="b"><a href="#">All link</a></div><div id="c">Some <a href="#">link</a> text</div>"##);
        assert_eq!(link_density(&first(&doc, "#a")), 0.0);
        assert_eq!(link_density(&first(&doc, "#b")), 1.0);
        let mixed = link_density(&first(&doc, "#c"));
        assert!(mixed > 0.0 && mixed < 1.0);
    }

    #[test]
    fn test_calculate_score_article() {
        let doc = Document::parse(
            r##"<article class="main-content">
            A long piece of prose that should score well, with commas, clauses, and a <a href="#">small link</a>.
            More text here to increase the character count, more commas, more content.
        </article>"##,
        );
        let result = calculate_score(&first(&doc, "article"), &ScoreConfig::default());

        assert_eq!(result.tag_name, "article");
        assert_eq!(result.base_score, 10.0);
        assert_eq!(result.class_weight, 25.0);
        assert!(result.link_density > 0.0 && result.link_density < 0.3);
        assert!(result.final_score > 25.0);
    }

    #[test]
    fn test_calculate_score_nav_penalized() {
        let doc = Document::parse(
            r##"<nav class="menu"><a href="#">Link 1</a><a href="#">Link 2</a><a href="#">Link 3</a></nav>"##,
        );
        let result = calculate_score(&first(&doc, "nav"), &ScoreConfig::default());

        assert_eq!(result.base_score, -5.0);
        assert_eq!(result.class_weight, -25.0);
        assert!(result.final_score <= 0.0);
    }
}
