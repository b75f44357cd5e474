//! Error types for wattpad-dl
//!
//! This module provides error handling for the library, including:
//! - The request pipeline failure taxonomy (validation, auth, upstream, build)
//! - HTTP status code mapping for the download API
//! - The user-facing HTML fragment shown for each failure class
//!
//! The status/message mapping is total by construction: every match below is
//! exhaustive with no wildcard arm, so adding an error variant without
//! deciding its client-facing outcome is a compile error rather than a
//! silently swallowed failure.

use thiserror::Error;

/// Result type alias for wattpad-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wattpad-dl
///
/// Covers every failure the download pipeline and its collaborators can
/// raise. Cancellation is deliberately *not* an error — it is a normal early
/// termination outcome carried by
/// [`DownloadOutcome::Cancelled`](crate::types::DownloadOutcome) and never
/// reaches the status mapping.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.api_base")
        key: Option<String>,
    },

    /// Exactly one of username/password was supplied.
    ///
    /// Detected during request validation, before any network call is made.
    #[error("incomplete credential pair: supply both username and password, or neither")]
    CredentialPair,

    /// The upstream credential exchange rejected the supplied pair.
    #[error("credential exchange rejected")]
    AuthRejected,

    /// The story (or part) does not exist upstream.
    ///
    /// Raised when the content API signals its domain-specific not-found
    /// codes, as opposed to a plain HTTP 404.
    #[error("story not found upstream")]
    StoryNotFound,

    /// The content source rate-limited us.
    #[error("rate limited by content source")]
    RateLimited,

    /// Any other non-success HTTP status from the content source
    #[error("upstream request failed with status {status}")]
    UpstreamStatus {
        /// The HTTP status code returned by the content source
        status: u16,
    },

    /// Book assembly failed (container serialization, image packing, ...)
    #[error("book assembly failed: {0}")]
    Build(String),

    /// Network-level error talking to the content source
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error (malformed upstream JSON)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServer(String),
}

impl Error {
    /// HTTP status code presented to the client for this failure.
    ///
    /// This is the fixed upstream-failure-to-outcome table: upstream 400/404
    /// and the domain not-found both collapse to 404, upstream 429 stays 429,
    /// everything else server-side is a 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 500,
            Error::CredentialPair => 422,
            Error::AuthRejected => 403,
            Error::StoryNotFound => 404,
            Error::RateLimited => 429,
            // Wattpad answers both bad requests and missing stories with
            // 400/404 interchangeably; the client sees one outcome.
            Error::UpstreamStatus { status: 400 | 404 } => 404,
            Error::UpstreamStatus { .. } => 500,
            Error::Build(_) => 500,
            Error::Network(_) => 500,
            Error::Serialization(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServer(_) => 500,
        }
    }

    /// User-facing HTML fragment for this failure.
    ///
    /// One fixed message per status class; internal detail never leaks to the
    /// response body (it goes to the logs instead).
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::CredentialPair => {
                "Include both the username <u>and</u> password, or neither."
            }
            Error::AuthRejected => "Incorrect username and/or password.",
            Error::StoryNotFound | Error::UpstreamStatus { status: 400 | 404 } => {
                "This story does not exist, or has been deleted."
            }
            Error::RateLimited => {
                "The source website is overloaded. Please try again in a few minutes."
            }
            Error::Config { .. }
            | Error::UpstreamStatus { .. }
            | Error::Build(_)
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::ApiServer(_) => "Something went wrong. Please try again later.",
        }
    }
}
