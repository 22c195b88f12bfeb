use reqwest::StatusCode;
use thiserror::Error;

/// Why a page request produced no photos.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never completed: connection, TLS, or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{url} returned {status}")]
    Status { status: StatusCode, url: String },

    /// The body did not match the expected shape for the endpoint.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}
