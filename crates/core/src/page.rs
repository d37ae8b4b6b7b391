//! XHTML page rendering for OneNote.

use crate::article::{Article, UNTITLED};

/// Body text used when the article content is blank.
pub const NO_CONTENT: &str = "No content";

/// Escapes text for use in XML character data and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the standalone XHTML document posted as a OneNote page.
///
/// The title (or `Untitled`) goes into both `<title>` and `<h1>`, followed by
/// a link back to the source and then the article markup, which is passed
/// through unescaped.
pub fn render_page(article: &Article) -> String {
    let title = match article.title.trim() {
        "" => UNTITLED,
        title => title,
    };
    let title = escape_xml(title);
    let source = escape_xml(&article.source_url);
    let content = match article.content.trim() {
        "" => NO_CONTENT,
        _ => article.content.as_str(),
    };

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{title}</h1>\n\
         <p>Source: <a href=\"{source}\">{source}</a></p>\n\
         {content}\n\
         </body>\n\
         </html>\n"
    )
}
