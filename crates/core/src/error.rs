//! Error types for web2onenote operations.
//!
//! This module defines the main error type [`ClipperError`], covering every
//! failure of the fetch, extract, sign-in and publish flow, and the
//! [`ClipperError::user_message`] mapping that turns any of them into the
//! single status line shown to the user.
//!
//! # Example
//!
//! ```rust
//! use web2onenote_core::{ClipperError, Result};
//!
//! fn require_section(section: Option<&str>) -> Result<&str> {
//!     section.ok_or(ClipperError::NoSectionSelected)
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for clipping operations.
#[derive(Error, Debug)]
pub enum ClipperError {
    /// Transport or protocol failure (reset connection, malformed response,
    /// undecodable body).
    #[error("Network or protocol error: {0}")]
    Network(String),

    /// The abandonment timer fired before the request completed.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The origin refused to serve the page to us.
    #[error("Cross-origin access denied: {0}")]
    CrossOriginDenied(String),

    /// Generic connection failure (refused, DNS, unexpected status).
    #[error("Could not connect to the target site: {0}")]
    Connection(String),

    /// A single attempt answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Content is not readable (score below threshold).
    ///
    /// Only the readability tier reports this; the extractor falls through
    /// to the next tier.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// No content candidates in the document.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// Every extraction tier failed.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Nothing has been extracted yet.
    #[error("No article has been extracted")]
    NoArticle,

    /// No account is signed in.
    #[error("Not signed in")]
    AuthRequired,

    /// Both silent and interactive token acquisition failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Notebook discovery produced no section to publish into.
    #[error("No OneNote section is selected")]
    NoSectionSelected,

    /// A notebook or section listing was rejected by the API.
    #[error("Notebook API returned {status}: {message}")]
    NotebookApi { status: u16, message: String },

    /// The page could not be created.
    #[error("Publishing failed: {0}")]
    PublishFailed(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read or write errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClipperError {
    /// Maps the error to the single status line shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClipperError::Network(_) => {
                "Network connection error (protocol failure), try another network or retry later".to_string()
            }
            ClipperError::Timeout { .. } => "Request timed out, check your connection and retry".to_string(),
            ClipperError::CrossOriginDenied(_) => {
                "Access to the page was denied, try another link or retry later".to_string()
            }
            ClipperError::Connection(_) | ClipperError::HttpStatus { .. } => {
                "Could not reach the target site, check the network or the link".to_string()
            }
            ClipperError::InvalidUrl(_) => "Please enter a valid http(s) link".to_string(),
            ClipperError::HtmlParseError(_)
            | ClipperError::NotReadable { .. }
            | ClipperError::NoContent
            | ClipperError::ExtractionFailed(_) => {
                "Could not extract the page content, check the link or the page structure".to_string()
            }
            ClipperError::NoArticle => "Extract some content first".to_string(),
            ClipperError::AuthRequired => "Please sign in first".to_string(),
            ClipperError::AuthFailed(_) => "Sign-in failed, please retry".to_string(),
            ClipperError::NoSectionSelected => {
                "No OneNote section found, check your OneNote notebooks".to_string()
            }
            ClipperError::NotebookApi { .. } => "Could not load notebooks, please retry later".to_string(),
            ClipperError::PublishFailed(_) => {
                "Saving to OneNote failed, check the sign-in state or retry later".to_string()
            }
            ClipperError::FileNotFound(path) => format!("File not found: {}", path.display()),
            ClipperError::Io(_) | ClipperError::Json(_) => format!("Unexpected error: {}", self),
            ClipperError::ConfigError(msg) => format!("Configuration error: {}", msg),
        }
    }
}

/// Result type alias for ClipperError.
pub type Result<T> = std::result::Result<T, ClipperError>;
