//! Library API integration tests
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use web2onenote_core::page::render_page;
use web2onenote_core::*;

fn fixture(name: &str) -> String {
    let path = format!("{}/../../tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(path).unwrap()
}

fn clipper_for(server: &MockServer, token: &str) -> Clipper<StaticTokenIdentity> {
    let fetch = FetchConfig::builder()
        .proxies(vec![
            ProxyEndpoint::new("down", format!("{}?url={{url}}", server.url("/down"))),
            ProxyEndpoint::new("wrapped", format!("{}?url={{url}}", server.url("/wrapped"))),
        ])
        .proxy_timeout(Duration::from_secs(5))
        .build();
    let graph = GraphClient::new(GraphConfig::builder().base_url(server.base_url()).build()).unwrap();

    Clipper::new(
        ProxyFetcher::new(fetch).unwrap(),
        ExtractConfig::default(),
        SessionManager::new(StaticTokenIdentity::new(token)),
        NotebookPublisher::new(graph),
    )
}

#[test]
fn test_extract_article_fixture() {
    let article = extract_article(&fixture("article.html"), "https://blog.example.com/ownership").unwrap();

    assert_eq!(article.tier, ExtractionTier::Readability);
    assert_eq!(article.title, "Understanding Ownership");
    assert_eq!(
        article.excerpt,
        "How ownership and borrowing keep memory safe without a garbage collector."
    );
    assert!(article.content.contains("Each value has a single owner"));
    assert!(article.content.contains(r#"src="https://blog.example.com/images/ownership.png""#));
    assert!(!article.content.contains("window.analytics"));
    assert!(!article.content.contains("Great post"));
    assert!(!article.content.contains("class="));
}

#[test]
fn test_body_fallback_fixture() {
    let article = extract_article(&fixture("body_only.html"), "https://status.example.com").unwrap();

    assert_eq!(article.tier, ExtractionTier::Body);
    assert_eq!(article.title, "Status Page");
    assert_eq!(article.content, "<span>All systems operational.</span>");
}

#[test]
fn test_empty_document_fixture() {
    let result = extract_article(&fixture("empty_content.html"), "https://example.com");
    assert!(matches!(result, Err(ClipperError::ExtractionFailed(_))));
}

#[test]
fn test_normalize_envelopes() {
    assert_eq!(normalize_body(r#"{"contents":"<p>hi</p>"}"#).html, "<p>hi</p>");
    assert_eq!(normalize_body("<p>hi</p>").html, "<p>hi</p>");
    assert_eq!(
        normalize_body(r#"{"data":{"contents":"<p>nested</p>"}}"#).envelope,
        Some(EnvelopeShape::DataContents)
    );
}

#[test]
fn test_article_json_output() {
    let article = extract_article(&fixture("body_only.html"), "https://status.example.com").unwrap();
    let json: serde_json::Value = serde_json::from_str(&article.to_format(OutputFormat::Json).unwrap()).unwrap();

    assert_eq!(json["tier"], "body");
    assert_eq!(json["title"], "Status Page");
}

#[tokio::test]
async fn test_clip_and_save_end_to_end() {
    let server = MockServer::start();
    let down = server.mock(|when, then| {
        when.method(GET).path("/down");
        then.status(503);
    });
    let wrapped = server.mock(|when, then| {
        when.method(GET).path("/wrapped").query_param("url", "https://example.com/article");
        then.status(200).json_body(json!({ "contents": fixture("article.html"), "status": { "http_code": 200 } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/me/onenote/notebooks");
        then.status(200).json_body(json!({ "value": [{ "id": "N1", "displayName": "Reading" }] }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/me/onenote/notebooks/N1/sections");
        then.status(200).json_body(json!({ "value": [{ "id": "S1", "displayName": "Clips" }] }));
    });
    let page = server.mock(|when, then| {
        when.method(POST)
            .path("/me/onenote/sections/S1/pages")
            .header("authorization", "Bearer secret-token")
            .body_contains("<title>My Title</title>")
            .body_contains("<p>Edited body</p>")
            .body_contains(r#"<a href="https://example.com/article">"#);
        then.status(201).json_body(json!({ "id": "P1" }));
    });

    let mut clipper = clipper_for(&server, "secret-token");
    clipper.initialize().await.unwrap();

    let article = clipper.extract("https://example.com/article").await.unwrap();
    assert_eq!(article.tier, ExtractionTier::Readability);
    assert_eq!(clipper.last_route(), Some(&Route::Proxy("wrapped".to_string())));
    down.assert();
    wrapped.assert();

    clipper.set_title("My Title").unwrap();
    clipper.set_content("<p>Edited body</p>").unwrap();
    clipper.select_notebook("N1").await.unwrap();
    clipper.select_section("S1");

    let created = clipper.save().await.unwrap();

    page.assert();
    assert_eq!(created.id.as_deref(), Some("P1"));
    assert_eq!(clipper.status(), Some("Saved to OneNote"));
}

#[tokio::test]
async fn test_save_without_sign_in() {
    let server = MockServer::start();
    let mut clipper = clipper_for(&server, "");

    clipper.initialize().await.unwrap();
    assert!(!clipper.session().is_signed_in());
    assert!(matches!(clipper.save().await, Err(ClipperError::NoArticle)));

    let path = format!("{}/../../tests/fixtures/body_only.html", env!("CARGO_MANIFEST_DIR"));
    clipper.extract(&path).await.unwrap();

    assert!(matches!(clipper.save().await, Err(ClipperError::AuthRequired)));
    assert_eq!(clipper.error(), Some("Please sign in first"));
}

#[test]
fn test_render_page_for_edited_article() {
    let mut article = extract_article(&fixture("body_only.html"), "https://status.example.com").unwrap();
    article.set_title("Ops <Status>");

    let page = render_page(&article);
    assert!(page.contains("<h1>Ops &lt;Status&gt;</h1>"));
    assert!(page.contains("<span>All systems operational.</span>"));
}
