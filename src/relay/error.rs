use thiserror::Error;

/// Why a relay attempt did not end with an attached file
#[derive(Debug, Error)]
pub enum RelayError {
    /// The upstream API failed, timed out or answered with an unusable envelope
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The upstream answered but offered nothing we can download
    #[error("no downloadable resource found")]
    NoResourceFound,
    /// The resource is larger than the transfer ceiling
    #[error("resource exceeds the transfer ceiling ({bytes} bytes)")]
    Oversize { bytes: u64 },
    #[error("HTTP request failed with status: {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The host refused the outbound message
    #[error("failed to send reply: {0}")]
    Send(anyhow::Error),
}
