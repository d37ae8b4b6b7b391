//! Page fetching through an ordered chain of fallback proxies.
//!
//! [`ProxyFetcher::fetch`] tries every configured [`ProxyEndpoint`] in
//! declared order, each under its own abandonment timer, and stops at the
//! first 2xx response. When every proxy has failed it makes one direct
//! request before giving up. Local files and stdin are read with
//! [`fetch_file`] and [`fetch_stdin`].

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::{ClipperError, Result};

/// Abandonment timer for each proxy attempt.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(15);

/// Abandonment timer for the final direct attempt.
pub const DEFAULT_DIRECT_TIMEOUT: Duration = Duration::from_secs(10);

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// A proxy that takes the target URL as a query parameter.
///
/// The `{url}` placeholder in the template is replaced by the
/// form-urlencoded target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub name: String,
    pub template: String,
}

impl ProxyEndpoint {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self { name: name.into(), template: template.into() }
    }

    /// Builds the proxied request URL for a target.
    pub fn request_url(&self, target: &Url) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        self.template.replace("{url}", &encoded)
    }
}

/// The public proxies tried by default, in order.
pub fn default_proxies() -> Vec<ProxyEndpoint> {
    vec![
        ProxyEndpoint::new("codetabs", "https://api.codetabs.com/v1/proxy/?quest={url}"),
        ProxyEndpoint::new("webpagesnap", "https://webpagesnap.com/api/scrape?url={url}"),
        ProxyEndpoint::new("allorigins", "https://api.allorigins.win/get?url={url}"),
    ]
}

/// HTTP configuration for fetching pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Proxies tried in order before the direct request.
    pub proxies: Vec<ProxyEndpoint>,
    /// Abandonment timer per proxy attempt.
    pub proxy_timeout: Duration,
    /// Abandonment timer for the direct attempt.
    pub direct_timeout: Duration,
    /// User-Agent sent on every attempt.
    pub user_agent: String,
    /// Accept-Language sent on every attempt.
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxies: default_proxies(),
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
            direct_timeout: DEFAULT_DIRECT_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

impl FetchConfig {
    /// Creates a new builder for FetchConfig.
    pub fn builder() -> FetchConfigBuilder {
        FetchConfigBuilder::new()
    }
}

/// Builder for FetchConfig.
///
/// ```rust
/// use std::time::Duration;
/// use web2onenote_core::{FetchConfig, ProxyEndpoint};
///
/// let config = FetchConfig::builder()
///     .proxies(vec![ProxyEndpoint::new("local", "http://localhost:8080/?url={url}")])
///     .proxy_timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(config.proxies.len(), 1);
/// ```
pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn new() -> Self {
        Self { config: FetchConfig::default() }
    }

    /// Replaces the proxy list. An empty list means direct-only.
    pub fn proxies(mut self, value: Vec<ProxyEndpoint>) -> Self {
        self.config.proxies = value;
        self
    }

    pub fn proxy_timeout(mut self, value: Duration) -> Self {
        self.config.proxy_timeout = value;
        self
    }

    pub fn direct_timeout(mut self, value: Duration) -> Self {
        self.config.direct_timeout = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.user_agent = value.into();
        self
    }

    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.config.accept_language = value.into();
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

impl Default for FetchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Which network path an attempt took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Proxy(String),
    Direct,
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded { status: u16 },
    Failed { reason: String },
}

/// One entry of the attempt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub route: Route,
    pub outcome: AttemptOutcome,
}

/// A successful fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Raw response body, possibly a proxy envelope.
    pub body: String,
    /// The route that produced the body.
    pub route: Route,
    /// Every attempt made, in order, the winning one last.
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, Copy)]
enum HeaderProfile {
    /// Full navigation header set sent through proxies.
    Browser,
    /// Reduced set for the unproxied request.
    Direct,
}

/// Fetches pages through the configured proxy chain.
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: Client,
    config: FetchConfig,
}

impl ProxyFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClipperError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches the target through the proxy chain, falling back to one direct request.
    ///
    /// Attempts are strictly sequential; each runs under its own timer, so
    /// abandoning one never affects the next. When everything fails the
    /// last observed error decides the reported failure class.
    pub async fn fetch(&self, target: &str) -> Result<FetchOutcome> {
        let target = parse_target(target)?;
        let mut attempts = Vec::with_capacity(self.config.proxies.len() + 1);

        for (index, proxy) in self.config.proxies.iter().enumerate() {
            let request_url = proxy.request_url(&target);
            let route = Route::Proxy(proxy.name.clone());
            tracing::debug!(proxy = %proxy.name, attempt = index + 1, url = %request_url, "trying proxy");

            match self
                .attempt(&request_url, self.config.proxy_timeout, HeaderProfile::Browser)
                .await
            {
                Ok((status, body)) => {
                    tracing::info!(proxy = %proxy.name, status, "proxy fetch succeeded");
                    attempts.push(Attempt { route: route.clone(), outcome: AttemptOutcome::Succeeded { status } });
                    return Ok(FetchOutcome { body, route, attempts });
                }
                Err(e) => {
                    tracing::warn!(proxy = %proxy.name, "proxy attempt failed: {e}");
                    attempts.push(Attempt { route, outcome: AttemptOutcome::Failed { reason: e.to_string() } });
                }
            }
        }

        tracing::debug!(url = %target, "all proxies failed, trying direct request");
        match self
            .attempt(target.as_str(), self.config.direct_timeout, HeaderProfile::Direct)
            .await
        {
            Ok((status, body)) => {
                tracing::info!(status, "direct fetch succeeded");
                attempts.push(Attempt { route: Route::Direct, outcome: AttemptOutcome::Succeeded { status } });
                Ok(FetchOutcome { body, route: Route::Direct, attempts })
            }
            Err(e) => {
                tracing::warn!("direct request failed: {e}");
                Err(classify_final(e))
            }
        }
    }

    /// Runs one request plus body read under a timer.
    async fn attempt(&self, url: &str, timeout: Duration, profile: HeaderProfile) -> Result<(u16, String)> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", ACCEPT_HTML)
            .header("Accept-Language", &self.config.accept_language);

        if let HeaderProfile::Browser = profile {
            request = request
                .header("Cache-Control", "max-age=0")
                .header("Upgrade-Insecure-Requests", "1")
                .header("DNT", "1")
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "cross-site")
                .header("Sec-Fetch-User", "?1");
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| classify_transport(&e, timeout))?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClipperError::HttpStatus { status: status.as_u16(), url: url.to_string() });
            }
            let body = response.text().await.map_err(|e| classify_transport(&e, timeout))?;
            Ok((status.as_u16(), body))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ClipperError::Timeout { timeout }),
        }
    }
}

fn parse_target(target: &str) -> Result<Url> {
    let parsed = Url::parse(target.trim()).map_err(|e| ClipperError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ClipperError::InvalidUrl(format!(
            "unsupported scheme '{}', expected http:// or https://",
            other
        ))),
    }
}

fn classify_transport(err: &reqwest::Error, timeout: Duration) -> ClipperError {
    if err.is_timeout() {
        ClipperError::Timeout { timeout }
    } else if err.is_connect() {
        ClipperError::Connection(err.to_string())
    } else {
        ClipperError::Network(err.to_string())
    }
}

/// Maps the last observed error onto the reported failure class.
fn classify_final(err: ClipperError) -> ClipperError {
    match err {
        ClipperError::HttpStatus { status, url }
            if status == StatusCode::FORBIDDEN.as_u16()
                || status == StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS.as_u16() =>
        {
            ClipperError::CrossOriginDenied(format!("HTTP {} from {}", status, url))
        }
        ClipperError::HttpStatus { status, url } => ClipperError::Connection(format!("HTTP {} from {}", status, url)),
        other => other,
    }
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(ClipperError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(ClipperError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    Ok(buffer)
}

/// Where a page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Url(String),
    File(String),
    Stdin,
}

impl PageSource {
    /// Classifies user input: `-` is stdin, anything with a URL scheme (or
    /// nothing at all) is a URL, everything else a file path.
    ///
    /// Single-letter schemes are Windows drive letters and stay file paths.
    /// Non-http schemes are routed to the fetcher, which rejects them.
    pub fn from_input(input: &str) -> Self {
        let input = input.trim();
        if input == "-" {
            return PageSource::Stdin;
        }

        let has_scheme = Url::parse(input).is_ok_and(|url| url.scheme().len() > 1);
        if input.is_empty() || has_scheme {
            PageSource::Url(input.to_string())
        } else {
            PageSource::File(input.to_string())
        }
    }
}
