use thiserror::Error;

/// Failure talking to the focus service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level failure: DNS, refused connection, timeout, TLS.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status. `message` is the
    /// response body, which the service fills with a human-readable reason.
    #[error("{message}")]
    Rejection { status: u16, message: String },

    /// The service answered 2xx but the body wasn't what we expected.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid service url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejection { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
