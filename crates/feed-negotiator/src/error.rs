//! Error types for feed negotiation

use thiserror::Error;

/// Errors raised while negotiating package feeds.
///
/// None of these fail a run: the negotiator logs them and falls back to
/// "no override".
#[derive(Error, Debug)]
pub enum NegotiationError {
    /// The runtime inventory command could not be run or failed
    #[error("runtime inventory failed: {0}")]
    Inventory(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// The package index answered with something other than a version listing
    #[error("unexpected package index response: {0}")]
    UnexpectedListing(String),

    /// A discovered feed URL is not an http(s) URL
    #[error("invalid feed URL {url:?}")]
    InvalidFeedUrl { url: String },

    /// A discovered feed URL did not answer the reachability probe
    #[error("feed {url} is unreachable (status {status})")]
    Unreachable { url: String, status: u16 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for NegotiationError {
    fn from(err: reqwest::Error) -> Self {
        NegotiationError::Http(err.to_string())
    }
}
