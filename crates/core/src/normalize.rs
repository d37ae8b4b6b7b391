//! Unwrapping of proxy responses.
//!
//! Some CORS proxies answer with the raw page, others wrap it in a JSON
//! envelope together with status metadata. [`normalize_body`] recovers the
//! page HTML in both cases and never fails: anything it cannot recognize is
//! passed through untouched.

use serde_json::Value;

/// The envelope shapes known from public proxies, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// `{"contents": "<html>"}` (allorigins)
    Contents,
    /// `{"contents": {"rendered": "<html>"}}`
    ContentsRendered,
    /// `{"data": {"contents": "<html>"}}`
    DataContents,
    /// `{"responseText": "<html>"}`
    ResponseText,
    /// `{"result": "<html>"}`
    Result,
}

impl EnvelopeShape {
    /// All shapes, highest priority first.
    pub const PROBE_ORDER: [EnvelopeShape; 5] = [
        EnvelopeShape::Contents,
        EnvelopeShape::ContentsRendered,
        EnvelopeShape::DataContents,
        EnvelopeShape::ResponseText,
        EnvelopeShape::Result,
    ];

    fn path(self) -> &'static [&'static str] {
        match self {
            EnvelopeShape::Contents => &["contents"],
            EnvelopeShape::ContentsRendered => &["contents", "rendered"],
            EnvelopeShape::DataContents => &["data", "contents"],
            EnvelopeShape::ResponseText => &["responseText"],
            EnvelopeShape::Result => &["result"],
        }
    }

    /// Returns the HTML held by this shape, if the value has it as a non-empty string.
    fn probe(self, value: &Value) -> Option<&str> {
        self.path()
            .iter()
            .try_fold(value, |current, key| current.get(*key))
            .and_then(Value::as_str)
            .filter(|html| !html.is_empty())
    }
}

/// A response body reduced to page HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBody {
    /// The page HTML.
    pub html: String,
    /// Which envelope the HTML came out of, `None` for raw bodies.
    pub envelope: Option<EnvelopeShape>,
}

/// Recovers page HTML from a raw response body.
///
/// A body that starts with `{` is parsed as JSON and probed against
/// [`EnvelopeShape::PROBE_ORDER`]; the first match wins. Parse errors and
/// unknown JSON fall through to the raw text.
pub fn normalize_body(raw: &str) -> NormalizedBody {
    if !raw.trim_start().starts_with('{') {
        return NormalizedBody { html: raw.to_string(), envelope: None };
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("body looks like JSON but does not parse ({e}), using raw text");
            return NormalizedBody { html: raw.to_string(), envelope: None };
        }
    };

    for shape in EnvelopeShape::PROBE_ORDER {
        if let Some(html) = shape.probe(&value) {
            tracing::debug!(?shape, "unwrapped proxy envelope");
            return NormalizedBody { html: html.to_string(), envelope: Some(shape) };
        }
    }

    tracing::debug!("JSON body matches no known envelope, using raw text");
    NormalizedBody { html: raw.to_string(), envelope: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_contents_envelope() {
        let normalized = normalize_body(r#"{"contents":"<p>hi</p>"}"#);
        assert_eq!(normalized.html, "<p>hi</p>");
        assert_eq!(normalized.envelope, Some(EnvelopeShape::Contents));
    }

    #[test]
    fn test_raw_html_unchanged() {
        let normalized = normalize_body("<p>hi</p>");
        assert_eq!(normalized.html, "<p>hi</p>");
        assert_eq!(normalized.envelope, None);
    }

    #[rstest]
    #[case(r#"{"contents":{"rendered":"<p>r</p>"}}"#, "<p>r</p>", EnvelopeShape::ContentsRendered)]
    #[case(r#"{"data":{"contents":"<p>d</p>"}}"#, "<p>d</p>", EnvelopeShape::DataContents)]
    #[case(r#"{"responseText":"<p>t</p>"}"#, "<p>t</p>", EnvelopeShape::ResponseText)]
    #[case(r#"{"result":"<p>x</p>","status":{"http_code":200}}"#, "<p>x</p>", EnvelopeShape::Result)]
    fn test_envelope_shapes(#[case] body: &str, #[case] expected: &str, #[case] shape: EnvelopeShape) {
        let normalized = normalize_body(body);
        assert_eq!(normalized.html, expected);
        assert_eq!(normalized.envelope, Some(shape));
    }

    #[test]
    fn test_priority_order() {
        let normalized = normalize_body(r#"{"result":"<p>late</p>","contents":"<p>early</p>"}"#);
        assert_eq!(normalized.html, "<p>early</p>");
    }

    #[test]
    fn test_empty_contents_falls_to_next_shape() {
        let normalized = normalize_body(r#"{"contents":"","responseText":"<p>t</p>"}"#);
        assert_eq!(normalized.html, "<p>t</p>");
        assert_eq!(normalized.envelope, Some(EnvelopeShape::ResponseText));
    }

    #[test]
    fn test_invalid_json_falls_through() {
        let body = "{not json at all <p>hi</p>";
        let normalized = normalize_body(body);
        assert_eq!(normalized.html, body);
        assert_eq!(normalized.envelope, None);
    }

    #[test]
    fn test_unknown_json_falls_through() {
        let body = r#"{"status":"ok"}"#;
        assert_eq!(normalize_body(body).html, body);
    }

    #[test]
    fn test_leading_whitespace_json() {
        let normalized = normalize_body("  \n{\"contents\":\"<p>hi</p>\"}");
        assert_eq!(normalized.html, "<p>hi</p>");
    }
}
