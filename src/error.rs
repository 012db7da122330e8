//! Error taxonomy
//!
//! `ExtractError` is terminal for a single-listing extraction. `ParseWarning`
//! travels inside per-field results and is only ever logged. A listing or
//! overlay that cannot be located is not an error at all and is modelled as
//! `None`.

use serde::Serialize;
use thiserror::Error;

/// Fatal failure of a single-listing extraction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no JSON-LD product data found on the page")]
    MissingStructuredData,

    #[error("canonical URL meta tag og:url not found")]
    MissingCanonicalUrl,
}

/// Non-fatal failure of an optional sub-field.
#[derive(Debug, Error)]
pub enum ParseWarning {
    #[error("structured data block {index} is not valid JSON: {source}")]
    InvalidJson {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    Absent(&'static str),

    #[error("{field} could not be parsed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Failure of one of the outbound sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("endpoint rejected upload with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure categories surfaced across the message boundary.
///
/// Each maps to its own user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    UnsupportedPage,
    PageNotReady,
    NoStructuredData,
    NoResults,
}

impl ErrorKind {
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedPage => "Open an Etsy listing page first",
            ErrorKind::PageNotReady => {
                "The page did not respond. Wait for it to finish loading or reload it"
            }
            ErrorKind::NoStructuredData => "No JSON-LD product data found on this page",
            ErrorKind::NoResults => "No listings found on this page",
        }
    }
}

impl From<&ExtractError> for ErrorKind {
    fn from(err: &ExtractError) -> Self {
        match err {
            ExtractError::MissingStructuredData | ExtractError::MissingCanonicalUrl => {
                ErrorKind::NoStructuredData
            }
        }
    }
}
