//! Minimal Microsoft Graph OneNote client.
//!
//! Only the three calls the clipper needs: list notebooks, list a notebook's
//! sections, and create a page in a section.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ClipperError, Result};

/// Graph v1.0 endpoint.
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// A OneNote notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookRef {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// A section inside a notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// A page created by [`GraphClient::create_page`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRef {
    pub id: Option<String>,
    /// Link that opens the page in OneNote on the web.
    pub web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedPage {
    id: Option<String>,
    links: Option<PageLinks>,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(rename = "oneNoteWebUrl")]
    one_note_web_url: Option<Link>,
}

#[derive(Debug, Default, Deserialize)]
struct Link {
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Settings for [`GraphClient`].
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub base_url: String,
    /// Timeout for each Graph request.
    pub timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { base_url: GRAPH_BASE_URL.to_string(), timeout: Duration::from_secs(30) }
    }
}

impl GraphConfig {
    pub fn builder() -> GraphConfigBuilder {
        GraphConfigBuilder::default()
    }
}

/// Fluent builder for [`GraphConfig`].
#[derive(Default)]
pub struct GraphConfigBuilder {
    config: GraphConfig,
}

impl GraphConfigBuilder {
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.config.base_url = value.into();
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.config.timeout = value;
        self
    }

    pub fn build(self) -> GraphConfig {
        self.config
    }
}

/// Authenticated calls to the OneNote API.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: Client,
    base_url: Url,
}

impl GraphClient {
    /// # Errors
    ///
    /// [`ClipperError::ConfigError`] when the base URL does not parse.
    pub fn new(config: GraphConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClipperError::ConfigError(format!("invalid Graph URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClipperError::ConfigError(format!("invalid Graph URL '{}'", config.base_url)));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClipperError::Network(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Appends path segments to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `GET /me/onenote/notebooks`
    pub async fn list_notebooks(&self, token: &str) -> Result<Vec<NotebookRef>> {
        let url = self.endpoint(&["me", "onenote", "notebooks"]);
        self.get_collection(url, token).await
    }

    /// `GET /me/onenote/notebooks/{id}/sections`
    pub async fn list_sections(&self, token: &str, notebook_id: &str) -> Result<Vec<SectionRef>> {
        let url = self.endpoint(&["me", "onenote", "notebooks", notebook_id, "sections"]);
        self.get_collection(url, token).await
    }

    async fn get_collection<T: for<'de> Deserialize<'de>>(&self, url: Url, token: &str) -> Result<Vec<T>> {
        tracing::debug!(url = %url, "listing");
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClipperError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ClipperError::NotebookApi { status: status.as_u16(), message });
        }

        let body = response.text().await.map_err(|e| ClipperError::Network(e.to_string()))?;
        let collection: Collection<T> = serde_json::from_str(&body)?;
        Ok(collection.value)
    }

    /// `POST /me/onenote/sections/{id}/pages` with an XHTML body.
    ///
    /// # Errors
    ///
    /// Any failure, transport or API, is reported as
    /// [`ClipperError::PublishFailed`].
    pub async fn create_page(&self, token: &str, section_id: &str, xhtml: &str) -> Result<PageRef> {
        let url = self.endpoint(&["me", "onenote", "sections", section_id, "pages"]);
        tracing::debug!(url = %url, bytes = xhtml.len(), "creating page");

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", "application/xhtml+xml")
            .body(xhtml.to_string())
            .send()
            .await
            .map_err(|e| ClipperError::PublishFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ClipperError::PublishFailed(format!("HTTP {}: {}", status.as_u16(), message)));
        }

        let created: CreatedPage = response.json().await.unwrap_or_default();
        Ok(PageRef {
            id: created.id,
            web_url: created.links.and_then(|l| l.one_note_web_url).and_then(|l| l.href),
        })
    }
}

/// Pulls `error.message` (or `error.code`) out of a Graph error response.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(ErrorEnvelope { error }) if !error.message.is_empty() => error.message,
        Ok(ErrorEnvelope { error }) if !error.code.is_empty() => error.code,
        _ => status.canonical_reason().unwrap_or("request failed").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> GraphClient {
        GraphClient::new(GraphConfig::builder().base_url(server.base_url()).build()).unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GraphClient::new(GraphConfig::builder().base_url("not a url").build());
        assert!(matches!(result, Err(ClipperError::ConfigError(_))));
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let graph = GraphClient::new(GraphConfig::default()).unwrap();
        let url = graph.endpoint(&["me", "onenote", "sections", "a/b c", "pages"]);
        assert_eq!(url.as_str(), "https://graph.microsoft.com/v1.0/me/onenote/sections/a%2Fb%20c/pages");
    }

    #[tokio::test]
    async fn test_list_notebooks() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/me/onenote/notebooks").header("authorization", "Bearer tok");
            then.status(200).json_body(json!({
                "value": [
                    { "id": "N1", "displayName": "Work", "isDefault": true },
                    { "id": "N2", "displayName": "Home" }
                ]
            }));
        });

        let notebooks = client(&server).list_notebooks("tok").await.unwrap();

        mock.assert();
        assert_eq!(notebooks.len(), 2);
        assert_eq!(notebooks[0], NotebookRef { id: "N1".into(), display_name: "Work".into() });
    }

    #[tokio::test]
    async fn test_list_sections_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/me/onenote/notebooks/N1/sections");
            then.status(401).json_body(json!({ "error": { "code": "40001", "message": "Token expired" } }));
        });

        let err = client(&server).list_sections("tok", "N1").await.unwrap_err();
        assert!(matches!(err, ClipperError::NotebookApi { status: 401, ref message } if message == "Token expired"));
    }

    #[tokio::test]
    async fn test_create_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/me/onenote/sections/S1/pages")
                .header("content-type", "application/xhtml+xml")
                .body_contains("<h1>Hi</h1>");
            then.status(201).json_body(json!({
                "id": "P1",
                "links": { "oneNoteWebUrl": { "href": "https://onenote.example/P1" } }
            }));
        });

        let page = client(&server).create_page("tok", "S1", "<html><body><h1>Hi</h1></body></html>").await.unwrap();

        mock.assert();
        assert_eq!(page.id.as_deref(), Some("P1"));
        assert_eq!(page.web_url.as_deref(), Some("https://onenote.example/P1"));
    }

    #[tokio::test]
    async fn test_create_page_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/me/onenote/sections/S1/pages");
            then.status(403).json_body(json!({ "error": { "code": "40004", "message": "Insufficient permissions" } }));
        });

        let err = client(&server).create_page("tok", "S1", "<html/>").await.unwrap_err();
        assert!(matches!(&err, ClipperError::PublishFailed(msg) if msg.contains("Insufficient permissions")));
    }
}
