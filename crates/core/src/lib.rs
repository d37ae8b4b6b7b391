//! Clip web articles into Microsoft OneNote.
//!
//! The crate covers the whole flow behind the `web2onenote` command:
//!
//! - [`fetch`] downloads a page through an ordered chain of public proxies,
//!   falling back to one direct request, and [`normalize`] unwraps proxy
//!   JSON envelopes;
//! - [`extract`] turns arbitrary HTML into an [`Article`] with a readability
//!   pass, falling back to the raw body and then to a plain-text snippet;
//! - [`auth`] and [`identity`] sign the user in against the Microsoft
//!   identity platform;
//! - [`graph`] and [`publish`] list notebooks and create pages;
//! - [`controller::Clipper`] holds the state a front end needs.
//!
//! # Example
//!
//! ```rust
//! use web2onenote_core::{extract_article, page::render_page};
//!
//! let html = "<html><head><title>Notes</title></head><body><p>Short note.</p></body></html>";
//! let mut article = extract_article(html, "https://example.com/notes").unwrap();
//! article.set_title("My Notes");
//!
//! let page = render_page(&article);
//! assert!(page.contains("<title>My Notes</title>"));
//! ```

pub mod article;
pub mod auth;
pub mod controller;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod graph;
pub mod identity;
pub mod metadata;
pub mod normalize;
pub mod page;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod publish;
pub mod scoring;

pub use article::{Article, ExtractionTier, OutputFormat};
pub use auth::{Account, AuthState, IdentityProvider, NOTEBOOK_SCOPES, SessionManager, StatusChange};
pub use controller::{Clipper, load_article};
pub use error::{ClipperError, Result};
pub use extract::{ExtractConfig, extract_article, extract_article_with_config};
pub use fetch::{FetchConfig, FetchOutcome, PageSource, ProxyEndpoint, ProxyFetcher, Route, fetch_file, fetch_stdin};
pub use graph::{GraphClient, GraphConfig, NotebookRef, PageRef, SectionRef};
pub use identity::{DeviceCodePrompt, IdentityConfig, MicrosoftIdentity, StaticTokenIdentity};
pub use normalize::{EnvelopeShape, NormalizedBody, normalize_body};
pub use parse::Document;
pub use publish::NotebookPublisher;
