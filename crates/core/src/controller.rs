//! The clipper's state holder.
//!
//! [`Clipper`] ties the fetcher, extractor, session and publisher together
//! behind the handful of operations a front end needs. Every operation
//! records its outcome in a status line or an error line. Failures never
//! leave the clipper unusable.

use crate::article::Article;
use crate::auth::{Account, IdentityProvider, SessionManager, StatusChange};
use crate::extract::{ExtractConfig, extract_article_with_config};
use crate::fetch::{FetchOutcome, PageSource, ProxyFetcher, Route, fetch_file, fetch_stdin};
use crate::graph::PageRef;
use crate::normalize::normalize_body;
use crate::publish::NotebookPublisher;
use crate::{ClipperError, Result};

/// Front-end state: the current URL, article, messages, session and catalog.
pub struct Clipper<P> {
    fetcher: ProxyFetcher,
    extract_config: ExtractConfig,
    session: SessionManager<P>,
    publisher: NotebookPublisher,
    url: String,
    article: Option<Article>,
    last_route: Option<Route>,
    status: Option<String>,
    error: Option<String>,
}

impl<P: IdentityProvider> Clipper<P> {
    pub fn new(
        fetcher: ProxyFetcher, extract_config: ExtractConfig, session: SessionManager<P>, publisher: NotebookPublisher,
    ) -> Self {
        Self {
            fetcher,
            extract_config,
            session,
            publisher,
            url: String::new(),
            article: None,
            last_route: None,
            status: None,
            error: None,
        }
    }

    /// The input of the last extraction.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn article(&self) -> Option<&Article> {
        self.article.as_ref()
    }

    /// How the last fetched page was reached.
    pub fn last_route(&self) -> Option<&Route> {
        self.last_route.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// User-facing message of the last failure.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn session(&self) -> &SessionManager<P> {
        &self.session
    }

    pub fn publisher(&self) -> &NotebookPublisher {
        &self.publisher
    }

    /// Records the outcome of an operation in the status or error line.
    fn record<T>(&mut self, result: Result<T>, status: impl FnOnce(&T) -> String) -> Result<T> {
        match &result {
            Ok(value) => {
                self.status = Some(status(value));
                self.error = None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "operation failed");
                self.status = None;
                self.error = Some(e.user_message());
            }
        }
        result
    }

    /// Derives the session state and loads notebooks when signed in.
    pub async fn initialize(&mut self) -> Result<()> {
        match self.session.check_status() {
            StatusChange::SignedIn(account) => {
                self.status = Some(format!("Signed in as {}", account.display_name()));
                self.discover().await
            }
            StatusChange::SignedOut => {
                self.publisher.clear();
                self.status = Some("Signed out".to_string());
                Ok(())
            }
            StatusChange::Unchanged => Ok(()),
        }
    }

    async fn discover(&mut self) -> Result<()> {
        let result = self.publisher.list_notebooks(&mut self.session).await.map(|n| n.len());
        self.record(result, |count| format!("Loaded {count} notebooks")).map(drop)
    }

    /// Fetches and extracts a page, replacing the current article.
    ///
    /// `input` is an http(s) URL, a file path, or `-` for stdin. The previous
    /// article is discarded up front, so a failed extraction leaves none.
    pub async fn extract(&mut self, input: &str) -> Result<&Article> {
        self.url = input.trim().to_string();
        self.article = None;
        self.last_route = None;
        self.status = Some("Extracting content...".to_string());
        self.error = None;

        let input = self.url.clone();
        let result = self.load(&input).await;
        let result = self.record(result, |article| format!("Extracted \"{}\"", article.title));
        let article = result?;

        Ok(self.article.insert(article))
    }

    async fn load(&mut self, input: &str) -> Result<Article> {
        let (article, route) = load_article(&self.fetcher, &self.extract_config, input).await?;
        self.last_route = route;
        Ok(article)
    }

    fn article_mut(&mut self) -> Result<&mut Article> {
        self.article.as_mut().ok_or(ClipperError::NoArticle)
    }

    /// Replaces the article title with a user edit.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        let result = self.article_mut().map(|article| article.set_title(title));
        self.record(result, |_| "Title updated".to_string())
    }

    /// Replaces the article content with a user edit.
    pub fn set_content(&mut self, content: &str) -> Result<()> {
        let result = self.article_mut().map(|article| article.set_content(content));
        self.record(result, |_| "Content updated".to_string())
    }

    /// Signs in, then loads notebooks.
    pub async fn login(&mut self) -> Result<Account> {
        self.status = Some("Signing in...".to_string());
        let result = self.session.login().await;
        let account = self.record(result, |account| format!("Signed in as {}", account.display_name()))?;

        if let Err(e) = self.discover().await {
            tracing::warn!(error = %e, "notebook discovery after sign-in failed");
        }
        Ok(account)
    }

    /// Signs out and clears the notebook catalog.
    pub async fn logout(&mut self) -> Result<()> {
        let result = self.session.logout().await;
        self.publisher.clear();
        self.record(result, |_| "Signed out".to_string())
    }

    pub async fn select_notebook(&mut self, notebook_id: &str) -> Result<()> {
        let result = self.publisher.select_notebook(&mut self.session, notebook_id).await;
        self.record(result, |_| "Notebook selected".to_string())
    }

    pub fn select_section(&mut self, section_id: &str) {
        self.publisher.select_section(section_id);
        self.status = Some("Section selected".to_string());
    }

    /// Publishes the current article to the selected section.
    pub async fn save(&mut self) -> Result<PageRef> {
        self.status = Some("Saving to OneNote...".to_string());
        let result = match self.article.as_ref() {
            Some(article) => self.publisher.publish(&mut self.session, article, None).await,
            None => Err(ClipperError::NoArticle),
        };
        self.record(result, |_| "Saved to OneNote".to_string())
    }
}

/// Reads a page from a URL, a file or stdin and extracts its article.
///
/// The route is only set for URLs. Proxy envelopes are unwrapped before
/// extraction.
pub async fn load_article(
    fetcher: &ProxyFetcher, config: &ExtractConfig, input: &str,
) -> Result<(Article, Option<Route>)> {
    let (html, source_url, route) = match PageSource::from_input(input) {
        PageSource::Url(url) => {
            let FetchOutcome { body, route, .. } = fetcher.fetch(&url).await?;
            (normalize_body(&body).html, url, Some(route))
        }
        PageSource::File(path) => (fetch_file(&path)?, path, None),
        PageSource::Stdin => (fetch_stdin()?, "-".to_string(), None),
    };

    let article = extract_article_with_config(&html, &source_url, config)?;
    Ok((article, route))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ExtractionTier;
    use crate::auth::testing::{FakeProvider, account};
    use crate::fetch::{FetchConfig, ProxyEndpoint};
    use crate::graph::{GraphClient, GraphConfig};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const PAGE: &str = r#"<html><head><title>Clip Me</title></head><body>
        <article class="post">
            <p>This opening paragraph is long enough to be scored, with commas, clauses, and plenty of words.</p>
            <p>The second paragraph keeps going, adding more sentences, more commas, and more text to read.</p>
        </article></body></html>"#;

    fn clipper(server: &MockServer, provider: FakeProvider) -> Clipper<FakeProvider> {
        let fetch = FetchConfig::builder()
            .proxies(vec![ProxyEndpoint::new("mock", format!("{}?url={{url}}", server.url("/proxy")))])
            .proxy_timeout(Duration::from_secs(2))
            .build();
        let graph = GraphClient::new(GraphConfig::builder().base_url(server.base_url()).build()).unwrap();

        Clipper::new(
            ProxyFetcher::new(fetch).unwrap(),
            ExtractConfig::default(),
            SessionManager::new(provider),
            NotebookPublisher::new(graph),
        )
    }

    #[tokio::test]
    async fn test_extract_through_proxy_envelope() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/proxy");
            then.status(200).json_body(json!({ "contents": PAGE }));
        });
        let mut clipper = clipper(&server, FakeProvider::default());

        let article = clipper.extract("https://example.com/post").await.unwrap();

        assert_eq!(article.tier, ExtractionTier::Readability);
        assert_eq!(article.title, "Clip Me");
        assert_eq!(clipper.last_route(), Some(&Route::Proxy("mock".to_string())));
        assert_eq!(clipper.url(), "https://example.com/post");
        assert!(clipper.error().is_none());
    }

    #[tokio::test]
    async fn test_failed_extract_sets_error_and_stays_usable() {
        let server = MockServer::start();
        let mut clipper = clipper(&server, FakeProvider::default());

        assert!(matches!(clipper.extract("ftp://example.com").await, Err(ClipperError::InvalidUrl(_))));
        assert!(clipper.error().is_some());
        assert_eq!(clipper.status(), None);
        assert!(clipper.article().is_none());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, PAGE).unwrap();
        clipper.extract(path.to_str().unwrap()).await.unwrap();

        assert!(clipper.error().is_none());
        assert!(clipper.article().is_some());
    }

    #[tokio::test]
    async fn test_edits_require_article() {
        let server = MockServer::start();
        let mut clipper = clipper(&server, FakeProvider::default());

        assert!(matches!(clipper.set_title("x"), Err(ClipperError::NoArticle)));
        assert!(matches!(clipper.save().await, Err(ClipperError::NoArticle)));
        assert_eq!(clipper.error(), Some("Extract some content first"));
    }

    #[tokio::test]
    async fn test_save_signed_out() {
        let server = MockServer::start();
        let mut clipper = clipper(&server, FakeProvider::default());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, PAGE).unwrap();
        clipper.extract(path.to_str().unwrap()).await.unwrap();

        assert!(matches!(clipper.save().await, Err(ClipperError::AuthRequired)));
        assert_eq!(clipper.error(), Some("Please sign in first"));
    }

    #[tokio::test]
    async fn test_initialize_discovers_notebooks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/me/onenote/notebooks");
            then.status(200).json_body(json!({ "value": [{ "id": "N1", "displayName": "Work" }] }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/me/onenote/notebooks/N1/sections");
            then.status(200).json_body(json!({ "value": [{ "id": "S1", "displayName": "Clips" }] }));
        });
        let mut clipper = clipper(&server, FakeProvider::signed_in("tok"));

        clipper.initialize().await.unwrap();

        assert!(clipper.session().is_signed_in());
        assert_eq!(clipper.publisher().selected_section(), Some("S1"));
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/me/onenote/notebooks");
            then.status(200).json_body(json!({ "value": [] }));
        });
        let provider = FakeProvider {
            login_account: Some(account("a1")),
            silent: Some("tok".to_string()),
            ..Default::default()
        };
        let mut clipper = clipper(&server, provider);

        let signed_in = clipper.login().await.unwrap();
        assert_eq!(signed_in.id, "a1");

        clipper.logout().await.unwrap();
        assert!(!clipper.session().is_signed_in());
        assert_eq!(clipper.status(), Some("Signed out"));
    }

    #[tokio::test]
    async fn test_failed_login_clears_status() {
        let server = MockServer::start();
        let mut clipper = clipper(&server, FakeProvider::default());

        assert!(matches!(clipper.login().await, Err(ClipperError::AuthFailed(_))));
        assert_eq!(clipper.status(), None);
        assert!(clipper.error().is_some());
    }

    #[tokio::test]
    async fn test_failed_extract_discards_previous_article() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/proxy");
            then.status(200).json_body(json!({ "contents": PAGE }));
        });
        let mut clipper = clipper(&server, FakeProvider::signed_in("tok"));
        clipper.extract("https://example.com/post").await.unwrap();
        assert!(clipper.last_route().is_some());

        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.html");
        assert!(clipper.extract(missing.to_str().unwrap()).await.is_err());

        assert!(clipper.article().is_none());
        assert!(clipper.last_route().is_none());
        assert!(matches!(clipper.save().await, Err(ClipperError::NoArticle)));
    }
}
