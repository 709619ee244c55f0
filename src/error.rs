use thiserror::Error;

/// Failures of the confirm / fetch / catalog / upload operations.
///
/// Shared by the upstream client, the playback coordinator and the gateway
/// server, so a failure keeps its meaning across every boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required parameter was missing or empty.
    #[error("{0}")]
    InvalidInput(String),

    /// The access grant step failed.
    #[error("{0}")]
    ConfirmationFailed(String),

    /// Byte retrieval failed.
    #[error("{0}")]
    FetchFailed(String),

    /// The upstream backend could not be reached.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    Unknown(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        GatewayError::InvalidInput(msg.into())
    }

    /// Maps a transport error from the HTTP client.
    ///
    /// Connection and timeout failures mean the backend is out of reach,
    /// anything else is left to the caller's `fallback`.
    pub fn from_transport(err: reqwest::Error, fallback: impl FnOnce(String) -> Self) -> Self {
        if err.is_connect() || err.is_timeout() {
            GatewayError::UpstreamUnavailable(err.to_string())
        } else {
            fallback(err.to_string())
        }
    }
}
